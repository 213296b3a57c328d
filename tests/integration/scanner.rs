//! Integration tests for directory scanning

use crate::integration::test_utils::{write_doc, OUTLINE_HEADER};
use docket::frontmatter::DocketLayout;
use docket::scanner::{ScanConfig, Scanner, FOLDER_MARKER};
use tempfile::TempDir;

fn project() -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write_doc(root, "ROADMAP.md", &format!("{}# Roadmap\n", OUTLINE_HEADER));
    write_doc(root, "README.md", "# Readme\n");
    write_doc(
        root,
        &format!("tasks/{}", FOLDER_MARKER),
        "---\ndocket-layout: file\ndocket-type: task\n---\nNotes about this folder.\n",
    );
    write_doc(root, "tasks/A.md", "# A \u{2014} First\n");
    write_doc(root, "tasks/B.md", "---\ntitle: Foreign\n---\n# B \u{2014} Second\n");
    write_doc(root, "tasks/archive/OLD.md", "# OLD \u{2014} Archived\n");
    write_doc(root, "node_modules/pkg/X.md", &format!("{}# X\n", OUTLINE_HEADER));
    temp_dir
}

#[test]
fn test_scan_project_tree() {
    let temp_dir = project();
    let root = temp_dir.path();
    let files = Scanner::new(root).scan().unwrap();

    let rel: Vec<String> = files
        .iter()
        .map(|f| f.path.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
        .collect();
    assert_eq!(
        rel,
        vec![
            "ROADMAP.md",
            "node_modules/pkg/X.md",
            "tasks/A.md",
            "tasks/B.md",
            "tasks/archive/OLD.md",
        ]
    );

    let b = &files[3];
    assert_eq!(b.frontmatter.layout(), DocketLayout::File);
    assert_eq!(b.body, "# B \u{2014} Second\n");
    assert_eq!(b.byte_offset, "---\ntitle: Foreign\n---\n".len());

    // Inheritance reaches nested directories
    assert_eq!(files[4].frontmatter.docket_type.as_deref(), Some("task"));
}

#[test]
fn test_scan_with_ignored_dirs_and_depth() {
    let temp_dir = project();
    let config = ScanConfig {
        ignore_dirs: vec!["node_modules".to_string()],
        max_depth: Some(1),
        ..ScanConfig::default()
    };
    let files = Scanner::with_config(temp_dir.path(), config).scan().unwrap();

    let names: Vec<String> = files
        .iter()
        .map(|f| f.path.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["ROADMAP.md", "A.md", "B.md"]);
}
