//! Directory scanner for docket documents
//!
//! Walks a directory tree depth-first, siblings in file-name order, and
//! collects every markdown file carrying docket markers. A `.docket-folder.md`
//! marker makes its frontmatter the inherited default for the directory and
//! everything below it, until a nested marker replaces it.

use crate::error::DocketError;
use crate::frontmatter::{extract_frontmatter, parse_docket_yaml, parse_file, DocketFile, DocketFrontmatter};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// File name of the folder marker
pub const FOLDER_MARKER: &str = ".docket-folder.md";

/// Scanner configuration
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Whether to follow symbolic links (default: false)
    pub follow_symlinks: bool,
    /// Directory names never descended into, in addition to hidden ones
    pub ignore_dirs: Vec<String>,
    /// Maximum directory depth below the root (None = unlimited)
    pub max_depth: Option<usize>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            follow_symlinks: false,
            ignore_dirs: Vec::new(),
            max_depth: None,
        }
    }
}

/// Docket document scanner
pub struct Scanner {
    root: PathBuf,
    config: ScanConfig,
}

impl Scanner {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            config: ScanConfig::default(),
        }
    }

    pub fn with_config(root: impl Into<PathBuf>, config: ScanConfig) -> Self {
        Self {
            root: root.into(),
            config,
        }
    }

    /// Collect every docket document under the root.
    pub fn scan(&self) -> Result<Vec<DocketFile>, DocketError> {
        if !self.root.is_dir() {
            return Err(DocketError::io(
                &self.root,
                std::io::Error::new(std::io::ErrorKind::NotFound, "not a directory"),
            ));
        }
        let mut results = Vec::new();
        self.scan_dir(&self.root, None, 0, &mut results);
        debug!(root = %self.root.display(), files = results.len(), "Scan complete");
        Ok(results)
    }

    fn scan_dir(
        &self,
        dir: &Path,
        inherited: Option<&DocketFrontmatter>,
        depth: usize,
        results: &mut Vec<DocketFile>,
    ) {
        let folder_frontmatter = read_folder_marker(dir);
        let effective = folder_frontmatter.as_ref().or(inherited);

        let mut subdirs = Vec::new();
        let listing = WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .follow_links(self.config.follow_symlinks)
            .sort_by_file_name();

        for entry in listing {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(dir = %dir.display(), error = %e, "Failed to read directory entry");
                    continue;
                }
            };
            let name = entry.file_name().to_string_lossy();

            if entry.file_type().is_dir() {
                if !name.starts_with('.') && !self.config.ignore_dirs.iter().any(|d| *d == name) {
                    subdirs.push(entry.path().to_path_buf());
                }
                continue;
            }

            if !name.ends_with(".md") || name == FOLDER_MARKER {
                continue;
            }

            let content = match std::fs::read_to_string(entry.path()) {
                Ok(content) => content,
                Err(e) => {
                    warn!(path = %entry.path().display(), error = %e, "Skipping unreadable file");
                    continue;
                }
            };

            if let Some(file) = parse_file(entry.path(), &content) {
                debug!(path = %file.path.display(), "Found docket file");
                results.push(file);
            } else if let Some(inherited) = effective {
                let (body, byte_offset) = match extract_frontmatter(&content) {
                    Some((_, body, offset)) => (body.to_string(), offset),
                    None => (content.clone(), 0),
                };
                debug!(path = %entry.path().display(), "Docket file via folder marker");
                results.push(DocketFile {
                    path: entry.path().to_path_buf(),
                    frontmatter: inherited.clone(),
                    body,
                    byte_offset,
                });
            }
        }

        if self.config.max_depth.is_some_and(|max| depth >= max) {
            return;
        }
        for subdir in subdirs {
            self.scan_dir(&subdir, effective, depth + 1, results);
        }
    }
}

/// Frontmatter of the directory's folder marker, if it has valid markers.
fn read_folder_marker(dir: &Path) -> Option<DocketFrontmatter> {
    let marker = dir.join(FOLDER_MARKER);
    if !marker.is_file() {
        return None;
    }
    let content = match std::fs::read_to_string(&marker) {
        Ok(content) => content,
        Err(e) => {
            warn!(path = %marker.display(), error = %e, "Unreadable folder marker");
            return None;
        }
    };
    let (yaml, _, _) = extract_frontmatter(&content)?;
    parse_docket_yaml(yaml)
}

/// Scan `dir` with the default configuration.
pub fn scan_directory(dir: &Path) -> Result<Vec<DocketFile>, DocketError> {
    Scanner::new(dir).scan()
}
