//! Integration tests for loading and merging documents from disk

use crate::integration::test_utils::{write_doc, OUTLINE_HEADER};
use docket::kv::KvFormat;
use docket::merge::MergeStore;
use docket::scanner::{scan_directory, FOLDER_MARKER};
use docket::types::{TaskSource, TaskStatus};
use std::fs::File;
use std::path::Path;
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

fn set_mtime(path: &Path, secs: u64) {
    let file = File::options().write(true).open(path).unwrap();
    file.set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(secs))
        .unwrap();
}

fn roadmap() -> String {
    format!(
        "{}# Roadmap\n\n## \u{1f504} CMX1 \u{2014} Core engine\nOwner:: amy\n\n### \u{23f3} CMX1A \u{2014} Parser\nPriority:: high\n\n### \u{2705} CMX1B \u{2014} Merge\n",
        OUTLINE_HEADER
    )
}

#[test]
fn test_load_directory_builds_hierarchy() {
    let temp_dir = TempDir::new().unwrap();
    write_doc(temp_dir.path(), "ROADMAP.md", &roadmap());
    write_doc(temp_dir.path(), "notes.md", "# Notes\nNothing structured here.\n");

    let mut store = MergeStore::new();
    let files = store.load_directory(temp_dir.path()).unwrap();
    assert_eq!(files, 1, "plain markdown is not a docket document");

    let names: Vec<&str> = store.all().iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["Roadmap", "CMX1", "CMX1A", "CMX1B"]);

    let roots = store.roots();
    assert_eq!(roots.len(), 1);
    assert_eq!(roots[0].name, "Roadmap");

    let children: Vec<&str> = store.children("CMX1").iter().map(|e| e.name.as_str()).collect();
    assert_eq!(children, vec!["CMX1A", "CMX1B"]);

    let parser = store.get("CMX1A").unwrap();
    assert_eq!(parser.status.as_deref(), Some("pending"));
    assert_eq!(parser.title, "Parser");
    assert_eq!(parser.entity_type, "task");
    assert_eq!(parser.fields["Priority"], "high");
}

#[test]
fn test_newer_file_wins_conflicting_field() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write_doc(root, "ROADMAP.md", &roadmap());
    write_doc(
        root,
        "tasks/CMX1A.md",
        "---\ndocket-layout: file\ndocket-type: task\n---\n# CMX1A \u{2014} Parser\nPriority:: low\nEstimate:: 3d\n",
    );
    set_mtime(&root.join("ROADMAP.md"), 1_000);
    set_mtime(&root.join("tasks/CMX1A.md"), 2_000);

    let mut store = MergeStore::new();
    store.load_directory(root).unwrap();

    let entity = store.get("CMX1A").unwrap();
    assert_eq!(entity.fields["Priority"], "low");
    assert_eq!(entity.fields["Estimate"], "3d");
    assert_eq!(entity.field_sources["Priority"].modified_ms, 2_000_000);
    assert!(entity.field_sources["Priority"].path.ends_with("tasks/CMX1A.md"));
    // Status only appears in the roadmap
    assert_eq!(entity.status.as_deref(), Some("pending"));
    assert!(entity.primary_file.ends_with("tasks/CMX1A.md"));
}

#[test]
fn test_older_file_loses_conflicting_field() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write_doc(root, "ROADMAP.md", &roadmap());
    write_doc(
        root,
        "tasks/CMX1A.md",
        "---\ndocket-layout: file\n---\n# CMX1A \u{2014} Parser\nPriority:: low\n",
    );
    set_mtime(&root.join("ROADMAP.md"), 5_000);
    set_mtime(&root.join("tasks/CMX1A.md"), 1_000);

    let mut store = MergeStore::new();
    store.load_directory(root).unwrap();

    let entity = store.get("CMX1A").unwrap();
    assert_eq!(entity.fields["Priority"], "high");
    assert!(entity.field_sources["Priority"].path.ends_with("ROADMAP.md"));
}

#[test]
fn test_folder_marker_supplies_layout_and_type() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write_doc(
        root,
        &format!("specs/{}", FOLDER_MARKER),
        "---\ndocket-layout: file\ndocket-type: spec\ndocket-format: kv-table\n---\n",
    );
    write_doc(
        root,
        "specs/AUTH.md",
        "# AUTH \u{2014} Authentication\n| Field | Value |\n|---|---|\n| Owner | bob |\n",
    );

    let files = scan_directory(root).unwrap();
    assert_eq!(files.len(), 1);

    let mut store = MergeStore::new();
    store.load_directory(root).unwrap();
    let entity = store.get("AUTH").unwrap();
    assert_eq!(entity.entity_type, "spec");
    assert_eq!(entity.fields["Owner"], "bob");
    assert_eq!(entity.primary_format, KvFormat::Table);
}

#[test]
fn test_per_document_status_table() {
    let temp_dir = TempDir::new().unwrap();
    write_doc(
        temp_dir.path(),
        "board.md",
        "---\ndocket-type: card\ndocket-status:\n  shipped: [SHIPPED, \"(s)\"]\n  queued: [QUEUED]\n---\n## SHIPPED C1 \u{2014} First\n## (s) C2 \u{2014} Second\n## QUEUED C3 \u{2014} Third\n## \u{2705} C4 \u{2014} Default glyph is plain text here\n",
    );

    let mut store = MergeStore::new();
    store.load_directory(temp_dir.path()).unwrap();

    assert_eq!(store.get("C1").unwrap().status.as_deref(), Some("shipped"));
    assert_eq!(store.get("C2").unwrap().status.as_deref(), Some("shipped"));
    assert_eq!(store.get("C3").unwrap().status.as_deref(), Some("queued"));
    assert!(store.get("C4").is_none());
    assert!(store.get("\u{2705} C4").unwrap().status.is_none());
}

#[test]
fn test_task_tree_projection() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write_doc(root, "ROADMAP.md", &roadmap());
    write_doc(
        root,
        "tasks/CMX1A.md",
        "---\ndocket-layout: file\n---\n# CMX1A \u{2014} Parser\nAssignee:: worker-1\nResult:: merged\n",
    );

    let mut store = MergeStore::new();
    store.load_directory(root).unwrap();

    let tasks = store.task_tree();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].count(), 4);

    let cmx1 = &tasks[0].children[0];
    assert_eq!(cmx1.id, "CMX1");
    assert_eq!(cmx1.status, TaskStatus::InProgress);
    assert_eq!(cmx1.source, TaskSource::Roadmap);

    let parser = &cmx1.children[0];
    assert_eq!(parser.id, "CMX1A");
    assert_eq!(parser.source, TaskSource::Both);
    assert_eq!(parser.agent.as_deref(), Some("worker-1"));
    assert_eq!(parser.result.as_deref(), Some("merged"));
    assert!(parser.spec_path.as_deref().unwrap().ends_with("CMX1A.md"));

    let merge = &cmx1.children[1];
    assert_eq!(merge.status, TaskStatus::Completed);
    assert!(merge.spec_path.is_none());
}

#[test]
fn test_missing_root_is_an_error() {
    let temp_dir = TempDir::new().unwrap();
    let mut store = MergeStore::new();
    assert!(store.load_directory(&temp_dir.path().join("nope")).is_err());
}
