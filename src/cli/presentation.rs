//! CLI presentation: text and json formatters per command.

use crate::error::DocketError;
use crate::frontmatter::DocketFile;
use crate::merge::MergedEntity;
use crate::trigger::TriggerBlock;
use crate::types::TaskNode;
use chrono::{DateTime, Utc};
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use owo_colors::OwoColorize;
use serde::Serialize;
use std::path::Path;

/// Format a section heading with bold/underline.
pub fn format_section_heading(title: &str) -> String {
    format!("{}", title.bold().underline())
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, DocketError> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// `path` relative to `root` when it lies under it.
fn display_path(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .display()
        .to_string()
}

fn format_millis(ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| "-".to_string())
}

pub fn format_scan_result(files: &[DocketFile], root: &Path, format: &str) -> Result<String, DocketError> {
    if format == "json" {
        let rows: Vec<serde_json::Value> = files
            .iter()
            .map(|f| {
                serde_json::json!({
                    "path": display_path(&f.path, root),
                    "type": f.frontmatter.docket_type,
                    "layout": f.frontmatter.layout(),
                    "format": f.frontmatter.format_hint(),
                })
            })
            .collect();
        return to_json(&rows);
    }

    if files.is_empty() {
        return Ok("No docket documents found.".to_string());
    }
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Path", "Type", "Layout", "Format"]);
    for f in files {
        table.add_row(vec![
            display_path(&f.path, root),
            f.frontmatter.docket_type.clone().unwrap_or_else(|| "-".to_string()),
            format!("{:?}", f.frontmatter.layout()).to_lowercase(),
            f.frontmatter.format_hint().to_string(),
        ]);
    }
    Ok(format!("{}\n{} document(s)", table, files.len()))
}

pub fn format_entity_list(
    entities: &[&MergedEntity],
    root: &Path,
    format: &str,
) -> Result<String, DocketError> {
    if format == "json" {
        return to_json(entities);
    }

    if entities.is_empty() {
        return Ok("No entities found.".to_string());
    }
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Name", "Status", "Title", "Fields", "File"]);
    for entity in entities {
        table.add_row(vec![
            entity.name.clone(),
            entity.status.clone().unwrap_or_else(|| "-".to_string()),
            entity.title.clone(),
            entity.fields.len().to_string(),
            display_path(&entity.primary_file, root),
        ]);
    }
    Ok(table.to_string())
}

pub fn format_entity_show(entity: &MergedEntity, root: &Path, format: &str) -> Result<String, DocketError> {
    if format == "json" {
        return to_json(entity);
    }

    let mut out = String::new();
    let heading = if entity.title == entity.name {
        entity.name.clone()
    } else {
        format!("{} \u{2014} {}", entity.name, entity.title)
    };
    out.push_str(&format!("{}\n\n", format_section_heading(&heading)));
    out.push_str(&format!(
        "  Status: {}\n",
        entity.status.as_deref().unwrap_or("-")
    ));
    if !entity.entity_type.is_empty() {
        out.push_str(&format!("  Type: {}\n", entity.entity_type));
    }
    out.push_str(&format!(
        "  Primary file: {} ({})\n",
        display_path(&entity.primary_file, root),
        entity.primary_format
    ));
    if !entity.children.is_empty() {
        out.push_str(&format!("  Children: {}\n", entity.children.join(", ")));
    }

    let mut keys: Vec<&String> = entity.fields.keys().collect();
    keys.sort_by_key(|k| k.to_lowercase());
    if keys.is_empty() {
        out.push_str("\n  No fields.");
        return Ok(out);
    }

    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Field", "Value", "Source", "Modified"]);
    for key in keys {
        let (source, modified) = match entity.field_sources.get(key) {
            Some(source) => (display_path(&source.path, root), format_millis(source.modified_ms)),
            None => ("-".to_string(), "-".to_string()),
        };
        table.add_row(vec![key.clone(), entity.fields[key].clone(), source, modified]);
    }
    out.push_str(&format!("\n{}", table));
    Ok(out)
}

pub fn format_triggers(blocks: &[TriggerBlock], format: &str) -> Result<String, DocketError> {
    if format == "json" {
        return to_json(blocks);
    }

    if blocks.is_empty() {
        return Ok("No trigger blocks found.".to_string());
    }
    let mut lines = Vec::new();
    for (i, block) in blocks.iter().enumerate() {
        let title = match &block.name {
            Some(name) => format!("Block {}: {}", i + 1, name),
            None => format!("Block {}", i + 1),
        };
        lines.push(format_section_heading(&title));
        for (j, clause) in block.clauses.iter().enumerate() {
            let keyword = match (clause.is_else, j) {
                (true, _) => "else".to_string(),
                (false, 0) => format!("if {}", clause.condition),
                (false, _) => format!("elif {}", clause.condition),
            };
            lines.push(format!("  {}", keyword));
            lines.push(format!("    then {}", clause.action.command_template));
        }
    }
    Ok(lines.join("\n"))
}

pub fn format_tasks(tasks: &[TaskNode]) -> Result<String, DocketError> {
    to_json(tasks)
}
