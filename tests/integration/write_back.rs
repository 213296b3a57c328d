//! Integration tests for set/create followed by write-back

use crate::integration::test_utils::{read_doc, write_doc, OUTLINE_HEADER};
use docket::error::DocketError;
use docket::kv::KvFormat;
use docket::merge::MergeStore;
use std::collections::HashMap;
use tempfile::TempDir;

#[test]
fn test_set_field_rewrites_only_the_section() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    let original = format!(
        "{}# Plan\n\nIntro prose: with a colon.\n\n## \u{23f3} T1 \u{2014} First\nOwner:: amy\nSome notes about T1.\n\n## T2 \u{2014} Second\nOwner:: bob\n",
        OUTLINE_HEADER
    );
    write_doc(root, "plan.md", &original);

    let mut store = MergeStore::new();
    store.load_directory(root).unwrap();
    store.set_field("T1", "Owner", "carol").unwrap();
    store.set_field("T1", "status", "WIP").unwrap();
    let written = store.write_back().unwrap();
    assert_eq!(written.len(), 1);

    let expected = format!(
        "{}# Plan\n\nIntro prose: with a colon.\n\n## \u{1f504} T1 \u{2014} First\nOwner:: carol\nSome notes about T1.\n\n## T2 \u{2014} Second\nOwner:: bob\n",
        OUTLINE_HEADER
    );
    assert_eq!(read_doc(root, "plan.md"), expected);
}

#[test]
fn test_write_back_is_stable_without_changes() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    let original = format!(
        "{}## \u{2705} A \u{2014} Alpha\n:: owner:amy, size:L\n\nDone last week.\n",
        OUTLINE_HEADER
    );
    write_doc(root, "packed.md", &original);

    let mut store = MergeStore::new();
    store.load_directory(root).unwrap();
    store.write_back().unwrap();

    assert_eq!(read_doc(root, "packed.md"), original);
}

#[test]
fn test_write_back_is_stable_for_inline_type_status_and_fenced_fields() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    let docs = [
        (
            "typed.md",
            format!("{}## D1 \u{2014} Design\nOwner:: amy\nType:: design-task\n", OUTLINE_HEADER),
        ),
        (
            "review.md",
            format!("{}## R1 \u{2014} Review\nOwner:: bob\nStatus:: review\n", OUTLINE_HEADER),
        ),
        (
            "fenced.md",
            format!(
                "{}## F1 \u{2014} Fenced\n---\nowner: amy\n---\nNote: keep this prose.\n",
                OUTLINE_HEADER
            ),
        ),
    ];
    for (name, content) in &docs {
        write_doc(root, name, content);
    }

    let mut store = MergeStore::new();
    store.load_directory(root).unwrap();
    assert_eq!(store.get("D1").unwrap().entity_type, "design-task");
    assert_eq!(store.get("R1").unwrap().status.as_deref(), Some("review"));
    assert_eq!(store.get("F1").unwrap().primary_format, KvFormat::Frontmatter);

    let written = store.write_back().unwrap();
    assert_eq!(written.len(), 3);
    for (name, content) in &docs {
        assert_eq!(&read_doc(root, name), content, "{} changed on write-back", name);
    }
}

#[test]
fn test_write_back_uses_document_status_table() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write_doc(
        root,
        "board.md",
        "---\ndocket-type: card\ndocket-status:\n  shipped: [SHIPPED]\n  queued: [QUEUED]\n---\n## SHIPPED C1 \u{2014} First\n## QUEUED C3 \u{2014} Third\n",
    );

    let mut store = MergeStore::new();
    store.load_directory(root).unwrap();
    store.set_field("C3", "status", "shipped").unwrap();
    store.write_back().unwrap();

    let content = read_doc(root, "board.md");
    assert!(content.contains("## SHIPPED C3 \u{2014} Third\n"), "{}", content);
    assert!(content.contains("## SHIPPED C1 \u{2014} First\n"));
    assert!(!content.contains("QUEUED C3"));
}

#[test]
fn test_set_field_then_reload_sees_value() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write_doc(
        root,
        "table.md",
        &format!(
            "{}## T \u{2014} Task\n| Field | Value |\n|-------|-------|\n| Owner | amy |\n\nTrailing prose.\n",
            OUTLINE_HEADER
        ),
    );

    let mut store = MergeStore::new();
    store.load_directory(root).unwrap();
    store.set_field("T", "Priority", "high").unwrap();
    store.write_back().unwrap();

    let content = read_doc(root, "table.md");
    assert!(content.contains("| Owner | amy |\n| Priority | high |"));
    assert!(content.ends_with("Trailing prose.\n"));

    let mut reloaded = MergeStore::new();
    reloaded.load_directory(root).unwrap();
    let entity = reloaded.get("T").unwrap();
    assert_eq!(entity.fields["Priority"], "high");
    assert_eq!(entity.fields["Owner"], "amy");
}

#[test]
fn test_create_entity_then_load() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write_doc(root, "plan.md", &format!("{}# Plan\n", OUTLINE_HEADER));

    let mut store = MergeStore::new();
    store.load_directory(root).unwrap();

    let mut fields = HashMap::new();
    fields.insert("Owner".to_string(), "dan".to_string());
    fields.insert("status".to_string(), "DONE".to_string());
    store
        .create_entity("NEW", "New work", &fields, &root.join("plan.md"), 2, KvFormat::Colons)
        .unwrap();

    assert_eq!(
        read_doc(root, "plan.md"),
        format!("{}# Plan\n## \u{2705} NEW \u{2014} New work\nOwner:: dan\n", OUTLINE_HEADER)
    );

    let created = store.get("NEW").unwrap();
    assert_eq!(created.status.as_deref(), Some("complete"));
    assert!(!created.fields.contains_key("status"));

    let mut reloaded = MergeStore::new();
    reloaded.load_directory(root).unwrap();
    let entity = reloaded.get("NEW").unwrap();
    assert_eq!(entity.status.as_deref(), Some("complete"));
    assert_eq!(entity.fields["Owner"], "dan");
    assert_eq!(reloaded.children("Plan")[0].name, "NEW");
}

#[test]
fn test_set_field_unknown_entity() {
    let mut store = MergeStore::new();
    let err = store.set_field("GHOST", "Owner", "x").unwrap_err();
    assert!(matches!(err, DocketError::EntityNotFound(name) if name == "GHOST"));
}

#[test]
fn test_write_back_skips_deleted_file() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write_doc(root, "gone.md", &format!("{}## G \u{2014} Gone\nOwner:: amy\n", OUTLINE_HEADER));

    let mut store = MergeStore::new();
    store.load_directory(root).unwrap();
    std::fs::remove_file(root.join("gone.md")).unwrap();

    store.set_field("G", "Owner", "bob").unwrap();
    let written = store.write_back().unwrap();
    assert!(written.is_empty());
    assert!(!root.join("gone.md").exists());
}
