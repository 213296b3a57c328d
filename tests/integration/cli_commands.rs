//! Integration tests for the command routes

use crate::integration::test_utils::{read_doc, with_config_home, write_doc, OUTLINE_HEADER};
use clap::Parser;
use docket::cli::{map_error, Cli, RunContext};
use docket::config::DocketConfig;
use docket::error::DocketError;
use docket::types::{TaskNode, TaskStatus};
use std::path::Path;
use tempfile::TempDir;

fn seed(root: &Path) {
    write_doc(
        root,
        "ROADMAP.md",
        &format!(
            "{}# Roadmap\n\n## \u{1f504} API \u{2014} Public API\nOwner:: amy\n\n### API1 \u{2014} Routes\nOwner:: bob\n",
            OUTLINE_HEADER
        ),
    );
    write_doc(
        root,
        "TRIGGERS.md",
        "# Stalls\nif idle({agent}, 600)\n  then cmx tell pm \"{agent} stalled\"\n",
    );
}

fn context(root: &Path) -> RunContext {
    RunContext::with_config(Some(root.to_path_buf()), DocketConfig::default()).unwrap()
}

fn run(ctx: &RunContext, args: &[&str]) -> Result<String, DocketError> {
    let mut argv = vec!["docket"];
    argv.extend_from_slice(args);
    let cli = Cli::try_parse_from(argv).unwrap();
    ctx.execute(&cli.command)
}

#[test]
fn test_scan_lists_docket_files() {
    let temp_dir = TempDir::new().unwrap();
    seed(temp_dir.path());
    let ctx = context(temp_dir.path());

    let text = run(&ctx, &["scan"]).unwrap();
    assert!(text.contains("ROADMAP.md"));
    assert!(!text.contains("TRIGGERS.md"));
    assert!(text.contains("1 document(s)"));

    let json: serde_json::Value = serde_json::from_str(&run(&ctx, &["scan", "--format", "json"]).unwrap()).unwrap();
    assert_eq!(json[0]["path"], "ROADMAP.md");
    assert_eq!(json[0]["type"], "task");
}

#[test]
fn test_list_and_roots() {
    let temp_dir = TempDir::new().unwrap();
    seed(temp_dir.path());
    let ctx = context(temp_dir.path());

    let json: serde_json::Value =
        serde_json::from_str(&run(&ctx, &["list", "--format", "json"]).unwrap()).unwrap();
    let names: Vec<&str> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Roadmap", "API", "API1"]);

    let roots: serde_json::Value =
        serde_json::from_str(&run(&ctx, &["list", "--roots", "--format", "json"]).unwrap()).unwrap();
    assert_eq!(roots.as_array().unwrap().len(), 1);

    let text = run(&ctx, &["list"]).unwrap();
    assert!(text.contains("in_progress"));
    assert!(text.contains("Public API"));
}

#[test]
fn test_show_and_missing_entity() {
    let temp_dir = TempDir::new().unwrap();
    seed(temp_dir.path());
    let ctx = context(temp_dir.path());

    let text = run(&ctx, &["show", "API"]).unwrap();
    assert!(text.contains("Status: in_progress"));
    assert!(text.contains("Children: API1"));
    assert!(text.contains("amy"));

    let err = run(&ctx, &["show", "NOPE"]).unwrap_err();
    assert!(matches!(err, DocketError::EntityNotFound(_)));
    assert!(map_error(&err).contains("docket list"));
}

#[test]
fn test_set_writes_back() {
    let temp_dir = TempDir::new().unwrap();
    seed(temp_dir.path());
    let ctx = context(temp_dir.path());

    let message = run(&ctx, &["set", "API1", "status", "DONE"]).unwrap();
    assert!(message.contains("Set API1.status = DONE"));

    let content = read_doc(temp_dir.path(), "ROADMAP.md");
    assert!(content.contains("### \u{2705} API1 \u{2014} Routes\nOwner:: bob\n"));
    assert!(content.contains("## \u{1f504} API \u{2014} Public API\nOwner:: amy\n"));
}

#[test]
fn test_set_leaves_other_documents_untouched() {
    let temp_dir = TempDir::new().unwrap();
    seed(temp_dir.path());
    let notes = format!(
        "{}## N1 -- Loose separator\nOwner:: cy\n\n## N2 \u{2014} Spaced\n\n\nOwner:: dee\n",
        OUTLINE_HEADER
    );
    write_doc(temp_dir.path(), "NOTES.md", &notes);
    let ctx = context(temp_dir.path());

    let message = run(&ctx, &["set", "API1", "Owner", "eve"]).unwrap();
    assert!(message.contains("Set API1.Owner = eve"));
    assert!(message.contains("ROADMAP.md"));

    assert!(read_doc(temp_dir.path(), "ROADMAP.md").contains("### API1 \u{2014} Routes\nOwner:: eve\n"));
    assert_eq!(read_doc(temp_dir.path(), "NOTES.md"), notes);
}

#[test]
fn test_create_appends_and_rejects_duplicates() {
    let temp_dir = TempDir::new().unwrap();
    seed(temp_dir.path());
    let ctx = context(temp_dir.path());

    let message = run(
        &ctx,
        &[
            "create", "API2", "--title", "Auth", "--file", "ROADMAP.md", "--level", "3",
            "--field", "Owner=cy", "--field", "status=TODO",
        ],
    )
    .unwrap();
    assert!(message.starts_with("Created API2"));
    assert!(read_doc(temp_dir.path(), "ROADMAP.md")
        .ends_with("### \u{23f3} API2 \u{2014} Auth\nOwner:: cy\n"));

    let err = run(&ctx, &["create", "API2", "--file", "ROADMAP.md"]).unwrap_err();
    assert!(matches!(err, DocketError::InvalidArgument(_)));

    let err = run(&ctx, &["create", "API3", "--file", "ROADMAP.md", "--field", "oops"]).unwrap_err();
    assert!(matches!(err, DocketError::InvalidArgument(_)));
}

#[test]
fn test_create_in_new_file_uses_config_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let mut config = DocketConfig::default();
    config.create.heading_level = 1;
    config.create.format = "packed".parse().unwrap();
    let ctx = RunContext::with_config(Some(temp_dir.path().to_path_buf()), config).unwrap();

    run(&ctx, &["create", "X", "--file", "new.md", "--field", "a=1", "--field", "b=2"]).unwrap();
    assert_eq!(read_doc(temp_dir.path(), "new.md"), "# X\n:: a:1, b:2\n");
}

#[test]
fn test_triggers_and_tasks() {
    let temp_dir = TempDir::new().unwrap();
    seed(temp_dir.path());
    let ctx = context(temp_dir.path());

    let json: serde_json::Value =
        serde_json::from_str(&run(&ctx, &["triggers", "TRIGGERS.md"]).unwrap()).unwrap();
    assert_eq!(json[0]["name"], "Stalls");
    assert_eq!(json[0]["clauses"][0]["condition"]["kind"], "idle");
    assert_eq!(json[0]["clauses"][0]["condition"]["seconds"], 600);

    let text = run(&ctx, &["triggers", "TRIGGERS.md", "--format", "text"]).unwrap();
    assert!(text.contains("if idle({agent}, 600)"));

    let err = run(&ctx, &["triggers", "MISSING.md"]).unwrap_err();
    assert!(matches!(err, DocketError::Io { .. }));

    let tasks: Vec<TaskNode> = serde_json::from_str(&run(&ctx, &["tasks"]).unwrap()).unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].children[0].id, "API");
    assert_eq!(tasks[0].children[0].status, TaskStatus::InProgress);
}

#[test]
fn test_context_loads_workspace_config() {
    let home = TempDir::new().unwrap();
    let temp_dir = TempDir::new().unwrap();
    write_doc(temp_dir.path(), ".docket/config.toml", "[create]\nheading_level = 4\n");

    let toml = with_config_home(&home, || {
        let ctx = RunContext::new(Some(temp_dir.path().to_path_buf()), None).unwrap();
        assert_eq!(ctx.config().create.heading_level, 4);
        run(&ctx, &["config"]).unwrap()
    });
    assert!(toml.contains("heading_level = 4"));
}
