//! Merge Store
//!
//! Accumulates entities from any number of docket files. An entity that
//! appears in several files is merged field by field, each field remembering
//! the file and modification time it was last taken from. Write-back rewrites
//! each entity's primary file in place, touching only its heading and field
//! lines.

use crate::entity::{
    create_entity_markdown, heading_name, non_status_fields, parse_file_entity, parse_heading,
    parse_outline, render_heading, Entity, EntityTree,
};
use crate::error::DocketError;
use crate::frontmatter::{extract_frontmatter, parse_file, parse_frontmatter, DocketFile, DocketLayout};
use crate::kv::{field_line_mask, serialize_kv, KvFormat};
use crate::scanner::scan_directory;
use crate::status::StatusMap;
use crate::types::{TaskNode, TaskSource, TaskStatus};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};

/// Key under which the heading status is tracked in `field_sources`
const STATUS_SOURCE: &str = "status";

/// Where a field value was last read from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldSource {
    pub path: PathBuf,
    /// Modification time of `path` when the value was taken, in ms since epoch
    pub modified_ms: i64,
}

impl FieldSource {
    pub fn new(path: impl Into<PathBuf>, modified_ms: i64) -> Self {
        Self {
            path: path.into(),
            modified_ms,
        }
    }
}

/// An entity merged across every file that mentions it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergedEntity {
    pub name: String,
    pub title: String,
    pub entity_type: String,
    /// Canonical status
    pub status: Option<String>,
    pub fields: HashMap<String, String>,
    pub field_sources: HashMap<String, FieldSource>,
    /// File that new fields and write-back go to
    pub primary_file: PathBuf,
    pub primary_format: KvFormat,
    /// Names of child entities, resolved through the store
    pub children: Vec<String>,
    /// Every file that mentions the entity, in load order
    pub seen_in: Vec<PathBuf>,
    /// `Type` line of the primary file as (key, value), written back verbatim
    #[serde(skip)]
    pub inline_type: Option<(String, String)>,
    /// Key of the field the status was read from, if not the heading
    #[serde(skip)]
    pub status_key: Option<String>,
}

impl MergedEntity {
    fn from_entity(entity: Entity, path: &Path, modified_ms: i64) -> Self {
        let mut field_sources: HashMap<String, FieldSource> = entity
            .fields
            .keys()
            .map(|key| (key.clone(), FieldSource::new(path, modified_ms)))
            .collect();
        if entity.status.is_some() {
            field_sources.insert(STATUS_SOURCE.to_string(), FieldSource::new(path, modified_ms));
        }

        let inline_type = entity
            .type_key
            .map(|key| (key, entity.entity_type.clone()));

        Self {
            name: entity.name,
            title: entity.title,
            entity_type: entity.entity_type,
            status: entity.status,
            fields: entity.fields,
            field_sources,
            primary_file: path.to_path_buf(),
            primary_format: entity.kv_format,
            children: Vec::new(),
            seen_in: vec![path.to_path_buf()],
            inline_type,
            status_key: entity.status_key,
        }
    }

    /// Number of tracked values currently attributed to the primary file.
    fn primary_count(&self) -> usize {
        self.field_sources
            .values()
            .filter(|source| source.path == self.primary_file)
            .count()
    }

    /// Fields as written into the primary file.
    ///
    /// Adds the file's inline type line back, and the status as a field when
    /// it has no heading marker to carry it.
    fn write_fields(&self, status_map: &StatusMap) -> HashMap<String, String> {
        let mut fields = self.fields.clone();
        if let Some((key, value)) = &self.inline_type {
            fields.entry(key.clone()).or_insert_with(|| value.clone());
        }
        if let Some(status) = &self.status {
            let canonical = status_map.canonicalize(status).unwrap_or(status.as_str());
            if status_map.write_form(canonical).is_none() {
                let key = self.status_key.as_deref().unwrap_or("Status");
                fields.insert(key.to_string(), status.clone());
            }
        }
        fields
    }

    /// First non-empty value among `keys`.
    pub fn field_any(&self, keys: &[&str]) -> Option<&str> {
        keys.iter()
            .filter_map(|key| self.fields.get(*key))
            .map(String::as_str)
            .find(|value| !value.is_empty())
    }
}

/// Name-keyed store of merged entities
#[derive(Debug, Clone, Default)]
pub struct MergeStore {
    entities: HashMap<String, MergedEntity>,
    /// Entity names in first-seen order
    order: Vec<String>,
    status_map: StatusMap,
    loaded_files: Vec<PathBuf>,
    layouts: HashMap<PathBuf, DocketLayout>,
}

impl MergeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_status_map(status_map: StatusMap) -> Self {
        Self {
            status_map,
            ..Self::default()
        }
    }

    pub fn status_map(&self) -> &StatusMap {
        &self.status_map
    }

    pub fn loaded_files(&self) -> &[PathBuf] {
        &self.loaded_files
    }

    /// Layout a loaded file was parsed with.
    pub fn file_layout(&self, path: &Path) -> Option<DocketLayout> {
        self.layouts.get(path).copied()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Load a docket file using its on-disk modification time.
    pub fn load_file(&mut self, file: &DocketFile) {
        let modified_ms = file_mtime_ms(&file.path);
        self.load_file_at(file, modified_ms);
    }

    /// Load a docket file as if it was last modified at `modified_ms`.
    pub fn load_file_at(&mut self, file: &DocketFile, modified_ms: i64) {
        let layout = file.frontmatter.layout();
        let local_map = file.frontmatter.status_map();
        let status_map = local_map.as_ref().unwrap_or(&self.status_map);

        match layout {
            DocketLayout::Outline => {
                let trees = parse_outline(&file.body, &file.frontmatter, status_map);
                for tree in trees {
                    self.merge_tree(tree, &file.path, modified_ms);
                }
            }
            DocketLayout::File | DocketLayout::Folder => {
                if let Some(entity) = parse_file_entity(&file.body, &file.frontmatter, status_map) {
                    self.merge_entity(entity, &file.path, modified_ms);
                }
            }
        }

        debug!(path = %file.path.display(), ?layout, modified_ms, "Loaded docket file");
        self.layouts.insert(file.path.clone(), layout);
        self.loaded_files.push(file.path.clone());
    }

    /// Scan `dir` and load every docket file found. Returns the file count.
    #[instrument(skip_all, fields(dir = %dir.display()))]
    pub fn load_directory(&mut self, dir: &Path) -> Result<usize, DocketError> {
        let files = scan_directory(dir)?;
        for file in &files {
            self.load_file(file);
        }
        info!(files = files.len(), entities = self.entities.len(), "Loaded directory");
        Ok(files.len())
    }

    /// Load markdown text as if read from `path`. Returns false when the text
    /// is not a docket document.
    pub fn load_string(&mut self, path: impl AsRef<Path>, content: &str) -> bool {
        let path = path.as_ref();
        self.load_string_at(path, content, file_mtime_ms(path))
    }

    pub fn load_string_at(&mut self, path: impl AsRef<Path>, content: &str, modified_ms: i64) -> bool {
        match parse_file(path.as_ref(), content) {
            Some(file) => {
                self.load_file_at(&file, modified_ms);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, name: &str) -> Option<&MergedEntity> {
        self.entities.get(name)
    }

    /// Every entity, nested ones included, in first-seen order.
    pub fn all(&self) -> Vec<&MergedEntity> {
        self.order
            .iter()
            .filter_map(|name| self.entities.get(name))
            .collect()
    }

    /// Resolved children of `name`.
    pub fn children(&self, name: &str) -> Vec<&MergedEntity> {
        self.entities
            .get(name)
            .map(|entity| {
                entity
                    .children
                    .iter()
                    .filter_map(|child| self.entities.get(child))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Entities that are nobody's child, in first-seen order.
    pub fn roots(&self) -> Vec<&MergedEntity> {
        let nested: HashSet<&str> = self
            .entities
            .values()
            .flat_map(|entity| entity.children.iter().map(String::as_str))
            .collect();
        self.all()
            .into_iter()
            .filter(|entity| !nested.contains(entity.name.as_str()))
            .collect()
    }

    /// Set a field in memory, stamped with the current time.
    ///
    /// A field named `status` in any case updates the entity status instead
    /// of the field map.
    pub fn set_field(&mut self, name: &str, field: &str, value: &str) -> Result<(), DocketError> {
        let entity = self
            .entities
            .get_mut(name)
            .ok_or_else(|| DocketError::EntityNotFound(name.to_string()))?;
        let now = now_ms();

        let key = if field.eq_ignore_ascii_case("status") {
            let canonical = self.status_map.canonicalize(value).unwrap_or(value);
            entity.status = Some(canonical.to_string());
            STATUS_SOURCE
        } else {
            entity.fields.insert(field.to_string(), value.to_string());
            field
        };

        match entity.field_sources.get_mut(key) {
            Some(source) => source.modified_ms = now,
            None => {
                let source = FieldSource::new(entity.primary_file.clone(), now);
                entity.field_sources.insert(key.to_string(), source);
            }
        }

        debug!(entity = name, field, value, "Set field");
        Ok(())
    }

    /// Rewrite every primary file with the current in-memory state.
    ///
    /// Files that no longer exist are skipped. Returns the rewritten paths.
    pub fn write_back(&self) -> Result<Vec<PathBuf>, DocketError> {
        let mut by_file: BTreeMap<&Path, Vec<&MergedEntity>> = BTreeMap::new();
        for entity in self.all() {
            by_file
                .entry(entity.primary_file.as_path())
                .or_default()
                .push(entity);
        }

        let mut written = Vec::new();
        for (path, entities) in by_file {
            if self.rewrite_file(path, &entities)? {
                written.push(path.to_path_buf());
            }
        }
        Ok(written)
    }

    /// Rewrite only `name`'s section of its primary file.
    ///
    /// Other entities in the same file are left as they are on disk. Returns
    /// the path, or `None` when the file no longer exists.
    pub fn write_back_entity(&self, name: &str) -> Result<Option<PathBuf>, DocketError> {
        let entity = self
            .entities
            .get(name)
            .ok_or_else(|| DocketError::EntityNotFound(name.to_string()))?;
        let path = entity.primary_file.as_path();
        Ok(self
            .rewrite_file(path, &[entity])?
            .then(|| path.to_path_buf()))
    }

    /// Apply `entities` to the file at `path`. False when the file is missing.
    fn rewrite_file(&self, path: &Path, entities: &[&MergedEntity]) -> Result<bool, DocketError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!(path = %path.display(), "Primary file missing, skipping write-back");
                return Ok(false);
            }
            Err(e) => return Err(DocketError::io(path, e)),
        };

        let local_map = parse_frontmatter(&content).and_then(|(fm, _, _)| fm.status_map());
        let status_map = local_map.as_ref().unwrap_or(&self.status_map);
        let updated = update_file_content(&content, entities, status_map);

        std::fs::write(path, updated).map_err(|e| DocketError::io(path, e))?;
        info!(path = %path.display(), entities = entities.len(), "Wrote back entities");
        Ok(true)
    }

    /// Append a new entity to `target_file` and register it in the store.
    ///
    /// The file is created when missing. A `status` field becomes the
    /// heading marker.
    pub fn create_entity(
        &mut self,
        name: &str,
        title: &str,
        fields: &HashMap<String, String>,
        target_file: &Path,
        heading_level: u8,
        format: KvFormat,
    ) -> Result<(), DocketError> {
        let markdown =
            create_entity_markdown(name, title, fields, heading_level, format, &self.status_map);

        let mut content = match std::fs::read_to_string(target_file) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => String::new(),
            Err(e) => return Err(DocketError::io(target_file, e)),
        };
        if !content.is_empty() && !content.ends_with('\n') {
            content.push('\n');
        }
        content.push_str(&markdown);
        std::fs::write(target_file, content).map_err(|e| DocketError::io(target_file, e))?;

        let now = now_ms();
        let status = fields
            .get("status")
            .or_else(|| fields.get("Status"))
            .map(|s| self.status_map.canonicalize(s).unwrap_or(s).to_string());
        let fields = non_status_fields(fields);
        let mut field_sources: HashMap<String, FieldSource> = fields
            .keys()
            .map(|key| (key.clone(), FieldSource::new(target_file, now)))
            .collect();
        if status.is_some() {
            field_sources.insert(STATUS_SOURCE.to_string(), FieldSource::new(target_file, now));
        }

        let merged = MergedEntity {
            name: name.to_string(),
            title: title.to_string(),
            entity_type: String::new(),
            status,
            fields,
            field_sources,
            primary_file: target_file.to_path_buf(),
            primary_format: format,
            children: Vec::new(),
            seen_in: vec![target_file.to_path_buf()],
            inline_type: None,
            status_key: None,
        };
        if self.entities.insert(name.to_string(), merged).is_none() {
            self.order.push(name.to_string());
        }

        info!(entity = name, path = %target_file.display(), "Created entity");
        Ok(())
    }

    /// Project root entities into task trees.
    pub fn task_tree(&self) -> Vec<TaskNode> {
        let mut visiting = HashSet::new();
        self.roots()
            .into_iter()
            .map(|entity| self.project_task(entity, &mut visiting))
            .collect()
    }

    fn project_task<'a>(&'a self, entity: &'a MergedEntity, visiting: &mut HashSet<&'a str>) -> TaskNode {
        visiting.insert(entity.name.as_str());

        let mut from_outline = false;
        let mut from_files = false;
        let mut spec_path = None;
        for path in &entity.seen_in {
            match self.file_layout(path) {
                Some(DocketLayout::Outline) => from_outline = true,
                Some(layout) => {
                    from_files = true;
                    if spec_path.is_none() && layout == DocketLayout::File {
                        spec_path = Some(path.display().to_string());
                    }
                }
                None => {}
            }
        }
        let source = match (from_outline, from_files) {
            (true, true) => TaskSource::Both,
            (false, true) => TaskSource::Filesystem,
            _ => TaskSource::Roadmap,
        };

        let mut children = Vec::new();
        for child in &entity.children {
            let Some(child) = self.entities.get(child) else {
                continue;
            };
            if visiting.contains(child.name.as_str()) {
                continue;
            }
            children.push(self.project_task(child, visiting));
        }

        visiting.remove(entity.name.as_str());

        TaskNode {
            id: entity.name.clone(),
            title: entity.title.clone(),
            source,
            status: TaskStatus::from_canonical(entity.status.as_deref()),
            result: entity.field_any(&["Result", "result"]).map(str::to_string),
            agent: entity
                .field_any(&["Assignee", "assignee", "Agent", "agent"])
                .map(str::to_string),
            children,
            spec_path,
        }
    }

    fn merge_tree(&mut self, tree: EntityTree, path: &Path, modified_ms: i64) {
        let parent = tree.entity.name.clone();
        self.merge_entity(tree.entity, path, modified_ms);

        let mut child_names = Vec::with_capacity(tree.children.len());
        for child in tree.children {
            child_names.push(child.entity.name.clone());
            self.merge_tree(child, path, modified_ms);
        }

        if let Some(entity) = self.entities.get_mut(&parent) {
            for child in child_names {
                if child != parent && !entity.children.contains(&child) {
                    entity.children.push(child);
                }
            }
        }
    }

    fn merge_entity(&mut self, entity: Entity, path: &Path, modified_ms: i64) {
        if !self.entities.contains_key(&entity.name) {
            debug!(entity = %entity.name, path = %path.display(), "New entity");
            self.order.push(entity.name.clone());
            self.entities.insert(
                entity.name.clone(),
                MergedEntity::from_entity(entity, path, modified_ms),
            );
            return;
        }
        let Some(existing) = self.entities.get_mut(&entity.name) else {
            return;
        };

        if !existing.seen_in.iter().any(|seen| seen == path) {
            existing.seen_in.push(path.to_path_buf());
        }

        let newer = |source: Option<&FieldSource>| source.map_or(true, |s| modified_ms >= s.modified_ms);

        let incoming_count = entity.fields.len() + usize::from(entity.status.is_some());

        for (key, value) in entity.fields {
            if newer(existing.field_sources.get(&key)) {
                existing
                    .field_sources
                    .insert(key.clone(), FieldSource::new(path, modified_ms));
                existing.fields.insert(key, value);
            }
        }

        if let Some(status) = entity.status {
            if newer(existing.field_sources.get(STATUS_SOURCE)) {
                existing.status = Some(status);
                existing.status_key = entity.status_key;
                existing
                    .field_sources
                    .insert(STATUS_SOURCE.to_string(), FieldSource::new(path, modified_ms));
            }
        }

        if incoming_count > existing.primary_count() {
            existing.primary_file = path.to_path_buf();
            existing.primary_format = entity.kv_format;
            existing.inline_type = entity.type_key.map(|key| (key, entity.entity_type));
        }

        debug!(
            entity = %existing.name,
            path = %path.display(),
            primary = %existing.primary_file.display(),
            "Merged entity"
        );
    }
}

/// Rewrite the headings and field lines of `entities` within `content`.
///
/// The frontmatter preamble and every line outside a matched section are
/// copied as they are. Inside a matched section the heading is re-rendered
/// and the field lines are replaced by one freshly serialized block, placed
/// where the first field line was or appended to the section.
pub fn update_file_content(content: &str, entities: &[&MergedEntity], status_map: &StatusMap) -> String {
    let (preamble, body) = match extract_frontmatter(content) {
        Some((_, _, offset)) => content.split_at(offset),
        None => ("", content),
    };

    let lines: Vec<&str> = body.lines().collect();
    let mut out: Vec<String> = Vec::with_capacity(lines.len());
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];
        let matched = heading_name(line, status_map).and_then(|(level, name)| {
            entities
                .iter()
                .find(|entity| entity.name == name)
                .map(|entity| (level, *entity))
        });
        let Some((level, entity)) = matched else {
            out.push(line.to_string());
            i += 1;
            continue;
        };

        out.push(render_heading(
            level,
            entity.status.as_deref(),
            &entity.name,
            &entity.title,
            status_map,
        ));
        i += 1;

        let fields = entity.write_fields(status_map);
        let mut block = (!fields.is_empty()).then(|| serialize_kv(&fields, entity.primary_format));
        let mut replaced = false;

        let start = i;
        while i < lines.len() && parse_heading(lines[i].trim()).is_none() {
            i += 1;
        }
        let section = &lines[start..i];
        let mask = field_line_mask(section, entity.primary_format);
        for (line, is_field) in section.iter().zip(mask) {
            if !is_field {
                out.push(line.to_string());
            } else if !replaced {
                out.extend(block.take());
                replaced = true;
            }
        }

        if !replaced {
            out.extend(block);
        }
    }

    let mut result = String::with_capacity(content.len());
    result.push_str(preamble);
    result.push_str(&out.join("\n"));
    result.push('\n');
    result
}

fn file_mtime_ms(path: &Path) -> i64 {
    std::fs::metadata(path)
        .and_then(|meta| meta.modified())
        .map(|modified| DateTime::<Utc>::from(modified).timestamp_millis())
        .unwrap_or(0)
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}
