//! KV Codec
//!
//! Four dialects for encoding key-value fields inside a markdown section:
//!
//! - `kv-colons`: `Key:: value`, one per line
//! - `kv-packed`: `:: key:value, key:value` on a single line
//! - `kv-table`: a two-column `| Field | Value |` table
//! - `kv-frontmatter`: a `---` delimited YAML block inside the section

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// KV encoding dialect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum KvFormat {
    #[default]
    #[serde(rename = "kv-colons", alias = "colons")]
    Colons,
    #[serde(rename = "kv-packed", alias = "packed")]
    Packed,
    #[serde(rename = "kv-table", alias = "table")]
    Table,
    #[serde(rename = "kv-frontmatter", alias = "frontmatter")]
    Frontmatter,
}

impl KvFormat {
    pub const ALL: [KvFormat; 4] = [
        KvFormat::Colons,
        KvFormat::Packed,
        KvFormat::Table,
        KvFormat::Frontmatter,
    ];

    /// The tag used in `docket-format` and configuration files.
    pub fn tag(self) -> &'static str {
        match self {
            KvFormat::Colons => "kv-colons",
            KvFormat::Packed => "kv-packed",
            KvFormat::Table => "kv-table",
            KvFormat::Frontmatter => "kv-frontmatter",
        }
    }

    /// Resolve a `docket-format` value.
    ///
    /// Accepts a literal tag (`kv-table`) or a template string containing a
    /// `{kv-*}` placeholder. Anything else falls back to colons.
    pub fn from_hint(hint: Option<&str>) -> KvFormat {
        let Some(hint) = hint else {
            return KvFormat::Colons;
        };
        KvFormat::ALL
            .into_iter()
            .find(|fmt| hint == fmt.tag() || hint.contains(&format!("{{{}}}", fmt.tag())))
            .unwrap_or_default()
    }
}

impl fmt::Display for KvFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for KvFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        KvFormat::ALL
            .into_iter()
            .find(|fmt| wanted == fmt.tag() || wanted == fmt.tag()["kv-".len()..])
            .ok_or_else(|| {
                format!(
                    "Invalid KV format: {} (must be one of colons, packed, table, frontmatter)",
                    s
                )
            })
    }
}

/// Parse key-value fields from `body` using the given dialect.
pub fn parse_kv(body: &str, format: KvFormat) -> HashMap<String, String> {
    match format {
        KvFormat::Colons => parse_colons(body),
        KvFormat::Packed => parse_packed(body),
        KvFormat::Table => parse_table(body),
        KvFormat::Frontmatter => parse_section_frontmatter(body),
    }
}

/// Serialize fields in the given dialect. Output has no trailing newline.
pub fn serialize_kv(fields: &HashMap<String, String>, format: KvFormat) -> String {
    match format {
        KvFormat::Colons => serialize_colons(fields),
        KvFormat::Packed => serialize_packed(fields),
        KvFormat::Table => serialize_table(fields),
        KvFormat::Frontmatter => serialize_section_frontmatter(fields),
    }
}

/// Guess the dialect used in a section body.
///
/// Lines are scanned in order and the first line that looks like any dialect
/// decides. Within a line the checks run frontmatter, packed, colons, table.
/// Defaults to colons.
pub fn detect_format(body: &str) -> KvFormat {
    for line in body.lines() {
        let trimmed = line.trim();

        if trimmed == "---" {
            return KvFormat::Frontmatter;
        }
        if trimmed.starts_with(":: ") {
            return KvFormat::Packed;
        }
        if let Some(pos) = trimmed.find(":: ") {
            if is_field_key(&trimmed[..pos]) {
                return KvFormat::Colons;
            }
        }
        if let Some(before) = bare_colons_key(trimmed) {
            if is_field_key(before) {
                return KvFormat::Colons;
            }
        }
        if is_table_row(trimmed) && trimmed.split('|').count() >= 3 {
            return KvFormat::Table;
        }
    }
    KvFormat::Colons
}

/// Whether a trimmed line could be a field line in `format`.
///
/// Frontmatter fields only count inside a closed `---` block, which one line
/// cannot tell; only the fence itself qualifies here. Use
/// [`field_line_mask`] for a whole section.
pub fn is_kv_line(line: &str, format: KvFormat) -> bool {
    match format {
        KvFormat::Colons => line.contains(":: ") || bare_colons_key(line).is_some(),
        KvFormat::Packed => line.starts_with(":: "),
        KvFormat::Table => is_table_row(line),
        KvFormat::Frontmatter => line == "---",
    }
}

/// For each line of a section body, whether it holds field data in `format`.
///
/// In the frontmatter dialect that is every line of a closed `---` block,
/// fences included; an unclosed fence marks nothing.
pub fn field_line_mask(lines: &[&str], format: KvFormat) -> Vec<bool> {
    if format != KvFormat::Frontmatter {
        return lines
            .iter()
            .map(|line| is_kv_line(line.trim(), format))
            .collect();
    }

    let mut mask = vec![false; lines.len()];
    let mut open: Option<usize> = None;
    for (idx, line) in lines.iter().enumerate() {
        if line.trim() != "---" {
            continue;
        }
        match open.take() {
            Some(start) => mask[start..=idx].iter_mut().for_each(|m| *m = true),
            None => open = Some(idx),
        }
    }
    mask
}

fn is_field_key(before: &str) -> bool {
    !before.is_empty() && !before.contains("  ")
}

/// `Key::` with nothing after the marker; headings never qualify.
fn bare_colons_key(trimmed: &str) -> Option<&str> {
    if trimmed.starts_with('#') {
        return None;
    }
    trimmed.strip_suffix("::")
}

fn is_table_row(trimmed: &str) -> bool {
    trimmed.starts_with('|') && trimmed.ends_with('|')
}

fn sorted_keys(fields: &HashMap<String, String>) -> Vec<&String> {
    let mut keys: Vec<&String> = fields.keys().collect();
    keys.sort();
    keys
}

fn sorted_keys_case_insensitive(fields: &HashMap<String, String>) -> Vec<&String> {
    let mut keys: Vec<&String> = fields.keys().collect();
    keys.sort_by(|a, b| a.to_lowercase().cmp(&b.to_lowercase()).then_with(|| a.cmp(b)));
    keys
}

// kv-colons

fn parse_colons(body: &str) -> HashMap<String, String> {
    let mut fields = HashMap::new();
    for line in body.lines() {
        let trimmed = line.trim();
        if let Some((key, value)) = trimmed.split_once(":: ") {
            let key = key.trim();
            if !key.is_empty() {
                fields.insert(key.to_string(), value.trim().to_string());
            }
        } else if let Some(key) = bare_colons_key(trimmed) {
            let key = key.trim();
            if !key.is_empty() {
                fields.insert(key.to_string(), String::new());
            }
        }
    }
    fields
}

fn serialize_colons(fields: &HashMap<String, String>) -> String {
    sorted_keys(fields)
        .into_iter()
        .map(|key| {
            let value = &fields[key];
            if value.is_empty() {
                format!("{}::", key)
            } else {
                format!("{}:: {}", key, value)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

// kv-packed

fn parse_packed(body: &str) -> HashMap<String, String> {
    let mut fields = HashMap::new();
    for line in body.lines() {
        let Some(rest) = line.trim().strip_prefix(":: ") else {
            continue;
        };
        for pair in rest.split(',') {
            if let Some((key, value)) = pair.trim().split_once(':') {
                let key = key.trim();
                if !key.is_empty() {
                    fields.insert(key.to_string(), value.trim().to_string());
                }
            }
        }
    }
    fields
}

fn serialize_packed(fields: &HashMap<String, String>) -> String {
    let pairs: Vec<String> = sorted_keys(fields)
        .into_iter()
        .map(|key| format!("{}:{}", key, fields[key]))
        .collect();
    format!(":: {}", pairs.join(", "))
}

// kv-table

fn is_separator_cell(cell: &str) -> bool {
    cell.chars().all(|c| matches!(c, '-' | '\u{2014}' | ' ' | ':'))
}

fn parse_table(body: &str) -> HashMap<String, String> {
    let mut fields = HashMap::new();
    let mut in_table = false;
    let mut separator_seen = false;

    for line in body.lines() {
        let trimmed = line.trim();
        if !is_table_row(trimmed) {
            if in_table {
                break;
            }
            continue;
        }

        // "| a | b |" splits into ["", "a", "b", ""]
        let cells: Vec<&str> = trimmed.split('|').map(str::trim).collect();
        if cells.len() < 4 {
            continue;
        }

        if !in_table {
            in_table = true;
            continue;
        }

        if !separator_seen && cells[1..cells.len() - 1].iter().all(|c| is_separator_cell(c)) {
            separator_seen = true;
            continue;
        }

        let key = cells[1];
        if !key.is_empty() {
            fields.insert(key.to_string(), cells[2].to_string());
        }
    }

    fields
}

fn serialize_table(fields: &HashMap<String, String>) -> String {
    let mut lines = vec![
        "| Field | Value |".to_string(),
        "|-------|-------|".to_string(),
    ];
    for key in sorted_keys_case_insensitive(fields) {
        lines.push(format!("| {} | {} |", key, fields[key]));
    }
    lines.join("\n")
}

// kv-frontmatter

fn parse_section_frontmatter(body: &str) -> HashMap<String, String> {
    let mut fields = HashMap::new();
    let mut in_yaml = false;
    let mut yaml_buf: Vec<&str> = Vec::new();

    for line in body.lines() {
        if line.trim() == "---" {
            if in_yaml {
                let text = yaml_buf.join("\n");
                if let Ok(serde_yaml::Value::Mapping(map)) =
                    serde_yaml::from_str::<serde_yaml::Value>(&text)
                {
                    for (key, value) in &map {
                        fields.insert(yaml_scalar_to_string(key), yaml_scalar_to_string(value));
                    }
                }
                yaml_buf.clear();
                in_yaml = false;
            } else {
                in_yaml = true;
            }
            continue;
        }
        if in_yaml {
            yaml_buf.push(line);
        }
    }

    fields
}

/// Render a YAML value as a field string: null is empty, booleans lowercase.
pub(crate) fn yaml_scalar_to_string(value: &serde_yaml::Value) -> String {
    match value {
        serde_yaml::Value::Null => String::new(),
        serde_yaml::Value::Bool(b) => b.to_string(),
        serde_yaml::Value::Number(n) => n.to_string(),
        serde_yaml::Value::String(s) => s.clone(),
        serde_yaml::Value::Tagged(tagged) => yaml_scalar_to_string(&tagged.value),
        other => serde_json::to_string(other).unwrap_or_default(),
    }
}

fn serialize_section_frontmatter(fields: &HashMap<String, String>) -> String {
    let mut lines = vec!["---".to_string()];
    for key in sorted_keys_case_insensitive(fields) {
        lines.push(format!("{}: {}", key, fields[key]));
    }
    lines.push("---".to_string());
    lines.join("\n")
}
