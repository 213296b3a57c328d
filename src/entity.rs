//! Entity extraction from markdown
//!
//! Headings become entities. A heading's content is an optional status
//! marker, then a name and title separated by an em-dash (or ` -- `); the
//! lines under it carry the entity's KV fields.

use crate::frontmatter::DocketFrontmatter;
use crate::kv::{detect_format, parse_kv, serialize_kv, KvFormat};
use crate::status::StatusMap;
use serde::Serialize;
use std::collections::HashMap;

const EM_DASH: char = '\u{2014}';

/// A parsed heading section
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entity {
    pub name: String,
    pub title: String,
    pub entity_type: String,
    /// Canonical status
    pub status: Option<String>,
    /// Status exactly as written on disk
    pub status_raw: Option<String>,
    pub fields: HashMap<String, String>,
    pub kv_format: KvFormat,
    pub body: String,
    /// 1 to 6
    pub heading_level: u8,
    /// 1-based line of the heading within the parsed body
    pub line_number: usize,
    /// Field key the type was read from, when it came from the body
    pub type_key: Option<String>,
    /// Field key the status was read from, when it came from the body
    pub status_key: Option<String>,
}

/// An entity and the entities nested under it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityTree {
    pub entity: Entity,
    pub children: Vec<EntityTree>,
}

/// Heading content split into its parts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadingContent {
    pub status: Option<String>,
    pub status_raw: Option<String>,
    pub name: String,
    pub title: String,
}

/// Per-document inputs shared by every entity built from it
struct DocContext<'a> {
    default_type: &'a str,
    format_hint: KvFormat,
    status_map: &'a StatusMap,
}

impl<'a> DocContext<'a> {
    fn new(frontmatter: &'a DocketFrontmatter, status_map: &'a StatusMap) -> Self {
        Self {
            default_type: frontmatter.docket_type.as_deref().unwrap_or(""),
            format_hint: frontmatter.format_hint(),
            status_map,
        }
    }
}

/// A heading whose section is still being collected
struct OpenHeading {
    level: u8,
    line_number: usize,
    content: HeadingContent,
    body_lines: Vec<String>,
}

/// Parse an outline-layout body into entity trees.
///
/// Every named heading is an entity whose body runs to the next heading.
/// Headings without a name are dropped together with their body lines.
pub fn parse_outline(
    body: &str,
    frontmatter: &DocketFrontmatter,
    status_map: &StatusMap,
) -> Vec<EntityTree> {
    let ctx = DocContext::new(frontmatter, status_map);
    let mut raw: Vec<(u8, Entity)> = Vec::new();
    let mut open: Option<OpenHeading> = None;

    for (idx, line) in body.lines().enumerate() {
        match parse_heading(line.trim()) {
            Some((level, rest)) => {
                if let Some(heading) = open.take() {
                    raw.push((heading.level, close_heading(heading, &ctx)));
                }
                let content = parse_heading_content(rest, status_map);
                if !content.name.is_empty() {
                    open = Some(OpenHeading {
                        level,
                        line_number: idx + 1,
                        content,
                        body_lines: Vec::new(),
                    });
                }
            }
            None => {
                if let Some(heading) = open.as_mut() {
                    heading.body_lines.push(line.to_string());
                }
            }
        }
    }

    if let Some(heading) = open.take() {
        raw.push((heading.level, close_heading(heading, &ctx)));
    }

    nest_entities(raw)
}

/// Parse a file-layout body: the first named heading is the file's single
/// entity and everything after that line is its body.
pub fn parse_file_entity(
    body: &str,
    frontmatter: &DocketFrontmatter,
    status_map: &StatusMap,
) -> Option<Entity> {
    let ctx = DocContext::new(frontmatter, status_map);
    let lines: Vec<&str> = body.lines().collect();

    for (idx, line) in lines.iter().enumerate() {
        let Some((level, rest)) = parse_heading(line.trim()) else {
            continue;
        };
        let content = parse_heading_content(rest, status_map);
        if content.name.is_empty() {
            continue;
        }
        let remaining = lines[idx + 1..].join("\n");
        return Some(build_entity(content, &remaining, level, idx + 1, &ctx));
    }
    None
}

/// Render markdown for a new entity: heading plus a KV block for every
/// field except `status`, which goes into the heading as a marker.
pub fn create_entity_markdown(
    name: &str,
    title: &str,
    fields: &HashMap<String, String>,
    heading_level: u8,
    format: KvFormat,
    status_map: &StatusMap,
) -> String {
    let status = fields.get("status").or_else(|| fields.get("Status"));
    let mut out = render_heading(heading_level, status.map(String::as_str), name, title, status_map);
    out.push('\n');

    let rest = non_status_fields(fields);
    if !rest.is_empty() {
        out.push_str(&serialize_kv(&rest, format));
        out.push('\n');
    }
    out
}

/// `{#×level} [marker ]name — title`.
///
/// The marker is the status's preferred write form and is left out when the
/// status has none. Headings whose title equals the name render the name
/// alone, matching how such headings are parsed.
pub fn render_heading(
    level: u8,
    status: Option<&str>,
    name: &str,
    title: &str,
    status_map: &StatusMap,
) -> String {
    let hashes = "#".repeat(level.clamp(1, 6) as usize);
    let marker = status
        .and_then(|s| status_map.canonicalize(s).or(Some(s)))
        .and_then(|canonical| status_map.write_form(canonical));

    let mut out = hashes;
    out.push(' ');
    if let Some(marker) = marker {
        out.push_str(marker);
        out.push(' ');
    }
    out.push_str(name);
    if title != name {
        out.push_str(&format!(" {} {}", EM_DASH, title));
    }
    out
}

/// Fields other than any case variant of `status`.
pub fn non_status_fields(fields: &HashMap<String, String>) -> HashMap<String, String> {
    fields
        .iter()
        .filter(|(k, _)| !k.eq_ignore_ascii_case("status"))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// Parse a markdown heading line (already trimmed).
///
/// Returns the level and the content after the hashes. Lines with more than
/// six hashes or no content are not headings.
pub fn parse_heading(line: &str) -> Option<(u8, &str)> {
    if !line.starts_with('#') {
        return None;
    }
    let level = line.chars().take_while(|&c| c == '#').count();
    if !(1..=6).contains(&level) {
        return None;
    }
    let rest = line[level..].trim();
    if rest.is_empty() {
        return None;
    }
    Some((level as u8, rest))
}

/// Split heading content into status marker, name and title.
pub fn parse_heading_content(rest: &str, status_map: &StatusMap) -> HeadingContent {
    let (status, status_raw, remainder) = match status_map.match_prefix(rest) {
        Some(prefix) => (
            Some(prefix.canonical.to_string()),
            Some(prefix.raw.to_string()),
            prefix.rest,
        ),
        None => (None, None, rest),
    };
    let (name, title) = split_name_title(remainder);
    HeadingContent {
        status,
        status_raw,
        name,
        title,
    }
}

/// Split on an em-dash, else on ` -- `; without either the whole string is
/// both name and title.
pub fn split_name_title(s: &str) -> (String, String) {
    if let Some((name, title)) = s.split_once(EM_DASH) {
        return (name.trim().to_string(), title.trim().to_string());
    }
    if let Some((name, title)) = s.split_once(" -- ") {
        return (name.trim().to_string(), title.trim().to_string());
    }
    let whole = s.trim().to_string();
    (whole.clone(), whole)
}

/// Level and entity name of a heading line, or `None` if it is not a heading.
pub fn heading_name(line: &str, status_map: &StatusMap) -> Option<(u8, String)> {
    let (level, rest) = parse_heading(line.trim())?;
    let (name, _) = split_name_title(status_map.strip_prefix(rest));
    Some((level, name))
}

fn close_heading(heading: OpenHeading, ctx: &DocContext<'_>) -> Entity {
    let mut body = heading.body_lines.join("\n");
    if !heading.body_lines.is_empty() {
        body.push('\n');
    }
    build_entity(heading.content, &body, heading.level, heading.line_number, ctx)
}

/// Remove the first of `keys` holding a non-empty value and return it with
/// its key; empty ones are consumed on the way.
fn take_first_non_empty(
    fields: &mut HashMap<String, String>,
    keys: &[&str],
) -> Option<(String, String)> {
    for key in keys {
        if let Some(value) = fields.remove(*key) {
            if !value.is_empty() {
                return Some((key.to_string(), value));
            }
        }
    }
    None
}

fn build_entity(
    content: HeadingContent,
    body: &str,
    heading_level: u8,
    line_number: usize,
    ctx: &DocContext<'_>,
) -> Entity {
    let kv_format = if body.trim().is_empty() {
        ctx.format_hint
    } else {
        detect_format(body)
    };
    let mut fields = parse_kv(body, kv_format);

    let (type_key, entity_type) = match take_first_non_empty(&mut fields, &["Type", "type"]) {
        Some((key, value)) => (Some(key), value),
        None => (None, ctx.default_type.to_string()),
    };

    let (status, status_raw, status_key) = match content.status {
        Some(status) => (Some(status), content.status_raw, None),
        None => match take_first_non_empty(&mut fields, &["Status", "status"]) {
            Some((key, raw)) => {
                let canonical = ctx
                    .status_map
                    .canonicalize(&raw)
                    .map(str::to_string)
                    .unwrap_or_else(|| raw.clone());
                (Some(canonical), Some(raw), Some(key))
            }
            None => (None, None, None),
        },
    };

    Entity {
        name: content.name,
        title: content.title,
        entity_type,
        status,
        status_raw,
        fields,
        kv_format,
        body: body.to_string(),
        heading_level,
        line_number,
        type_key,
        status_key,
    }
}

/// Nest `(depth, entity)` pairs into trees with a depth stack.
///
/// Pushing a node first pops every stacked node at the same or a deeper
/// level, attaching each to the node below it (or to the roots).
fn nest_entities(items: Vec<(u8, Entity)>) -> Vec<EntityTree> {
    let mut roots: Vec<EntityTree> = Vec::new();
    let mut stack: Vec<(u8, EntityTree)> = Vec::new();

    fn pop_into(stack: &mut Vec<(u8, EntityTree)>, roots: &mut Vec<EntityTree>) {
        if let Some((_, popped)) = stack.pop() {
            match stack.last_mut() {
                Some((_, parent)) => parent.children.push(popped),
                None => roots.push(popped),
            }
        }
    }

    for (depth, entity) in items {
        while stack.last().is_some_and(|(d, _)| *d >= depth) {
            pop_into(&mut stack, &mut roots);
        }
        stack.push((
            depth,
            EntityTree {
                entity,
                children: Vec::new(),
            },
        ));
    }

    while !stack.is_empty() {
        pop_into(&mut stack, &mut roots);
    }

    roots
}
