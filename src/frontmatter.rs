//! Frontmatter marker detection
//!
//! A docket document starts with a YAML preamble carrying at least one of the
//! `docket-type`, `docket-layout`, `docket-format` or `docket-status` keys.
//! Anything else, including malformed YAML, is simply not a docket document.

use crate::kv::{yaml_scalar_to_string, KvFormat};
use crate::status::StatusMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// How a document's entities map onto its headings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocketLayout {
    /// Many entities per file, nested by heading depth
    Outline,
    /// One entity per file
    File,
    /// Settings shared across a directory via a folder marker
    Folder,
}

impl DocketLayout {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "outline" => Some(DocketLayout::Outline),
            "file" => Some(DocketLayout::File),
            "folder" => Some(DocketLayout::Folder),
            _ => None,
        }
    }
}

/// Parsed docket marker keys
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocketFrontmatter {
    pub docket_type: Option<String>,
    pub docket_layout: Option<DocketLayout>,
    pub docket_format: Option<String>,
    /// canonical -> representations, in document order
    pub docket_status: Option<Vec<(String, Vec<String>)>>,
    /// Reserved
    pub docket_regex: Option<String>,
}

impl DocketFrontmatter {
    /// Layout with the outline default applied.
    pub fn layout(&self) -> DocketLayout {
        self.docket_layout.unwrap_or(DocketLayout::Outline)
    }

    /// KV format hint from `docket-format`.
    pub fn format_hint(&self) -> KvFormat {
        KvFormat::from_hint(self.docket_format.as_deref())
    }

    /// Status table declared by the document itself, if any.
    pub fn status_map(&self) -> Option<StatusMap> {
        self.docket_status
            .as_ref()
            .map(|table| StatusMap::from_raw(table.iter().cloned()))
    }

    fn has_marker(&self) -> bool {
        self.docket_type.is_some()
            || self.docket_layout.is_some()
            || self.docket_format.is_some()
            || self.docket_status.is_some()
    }
}

/// A markdown file recognized as a docket document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocketFile {
    pub path: PathBuf,
    pub frontmatter: DocketFrontmatter,
    /// Text after the closing fence
    pub body: String,
    /// Byte offset of `body` within the original content
    pub byte_offset: usize,
}

/// Parse a document for docket markers.
///
/// Returns the frontmatter, the body and the body's byte offset, or `None`
/// when the content is not a docket document.
pub fn parse_frontmatter(content: &str) -> Option<(DocketFrontmatter, &str, usize)> {
    let (yaml, body, offset) = extract_frontmatter(content)?;
    let frontmatter = parse_docket_yaml(yaml)?;
    Some((frontmatter, body, offset))
}

/// Parse a file's content into a [`DocketFile`].
pub fn parse_file(path: &Path, content: &str) -> Option<DocketFile> {
    let (frontmatter, body, byte_offset) = parse_frontmatter(content)?;
    Some(DocketFile {
        path: path.to_path_buf(),
        frontmatter,
        body: body.to_string(),
        byte_offset,
    })
}

/// Split a `---` fenced preamble from the rest of the content.
///
/// Returns `(yaml, body, body_offset)`. The closing fence is the first
/// `\n---` after the opening one; the body starts on the line after it.
pub fn extract_frontmatter(content: &str) -> Option<(&str, &str, usize)> {
    let trimmed = content.trim_start();
    if !trimmed.starts_with("---") {
        return None;
    }
    let leading = content.len() - trimmed.len();

    let after_fence = &trimmed[3..];
    let (after_first, skipped_newline) = match after_fence.strip_prefix('\n') {
        Some(rest) => (rest, 1),
        None => (after_fence, 0),
    };

    let end = after_first.find("\n---")?;
    let yaml = &after_first[..end];

    let close_line = &after_first[end + 4..];
    let body_start = match close_line.find('\n') {
        Some(nl) => end + 4 + nl + 1,
        None => after_first.len(),
    };

    let offset = leading + 3 + skipped_newline + body_start;
    Some((yaml, &content[offset..], offset))
}

/// Parse marker keys from a YAML string.
///
/// `None` when the YAML is invalid, not a mapping, or carries no marker key.
pub fn parse_docket_yaml(yaml: &str) -> Option<DocketFrontmatter> {
    let value: serde_yaml::Value = serde_yaml::from_str(yaml).ok()?;
    let map = value.as_mapping()?;

    let string_key = |key: &str| -> Option<String> {
        match map.get(key)? {
            serde_yaml::Value::Null => None,
            other => Some(yaml_scalar_to_string(other)),
        }
    };

    let frontmatter = DocketFrontmatter {
        docket_type: string_key("docket-type"),
        docket_layout: map
            .get("docket-layout")
            .and_then(serde_yaml::Value::as_str)
            .and_then(DocketLayout::parse),
        docket_format: string_key("docket-format"),
        docket_status: map.get("docket-status").and_then(parse_status_table),
        docket_regex: string_key("docket-regex"),
    };

    frontmatter.has_marker().then_some(frontmatter)
}

/// `docket-status` is a mapping of canonical name to a list of
/// representations; a bare string counts as a one-element list.
fn parse_status_table(value: &serde_yaml::Value) -> Option<Vec<(String, Vec<String>)>> {
    let map = value.as_mapping()?;
    let mut table = Vec::with_capacity(map.len());
    for (canonical, reprs) in map {
        let representations = match reprs {
            serde_yaml::Value::Sequence(items) => {
                items.iter().map(yaml_scalar_to_string).collect()
            }
            serde_yaml::Value::Null => Vec::new(),
            scalar => vec![yaml_scalar_to_string(scalar)],
        };
        table.push((yaml_scalar_to_string(canonical), representations));
    }
    Some(table)
}
