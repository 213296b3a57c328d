//! Configuration System
//!
//! Layered configuration: built-in defaults, then the user's global file,
//! then the workspace file, then `DOCKET__*` environment variables. Covers
//! the status table, defaults for entity creation, and logging.

use crate::error::DocketError;
use crate::kv::KvFormat;
use crate::logging::{validate_logging, LoggingConfig};
use crate::status::StatusMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;

mod facade;
mod merge;
mod sources;

pub use facade::ConfigLoader;
pub use sources::global_file::global_config_path;
pub use sources::workspace_file::workspace_config_path;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocketConfig {
    /// Directory scanned for docket documents (defaults to current directory)
    pub root: Option<PathBuf>,

    /// Status table, in write-preference order. Empty means the built-in table.
    #[serde(default)]
    pub statuses: Vec<StatusEntry>,

    /// Defaults for newly created entities
    #[serde(default)]
    pub create: CreateDefaults,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// One canonical status and its on-disk representations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEntry {
    pub canonical: String,
    #[serde(default)]
    pub representations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateDefaults {
    #[serde(default = "default_heading_level")]
    pub heading_level: u8,

    #[serde(default)]
    pub format: KvFormat,
}

fn default_heading_level() -> u8 {
    2
}

impl Default for CreateDefaults {
    fn default() -> Self {
        Self {
            heading_level: default_heading_level(),
            format: KvFormat::default(),
        }
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    Status(String, String),
    Create(String),
    Logging(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Status(name, msg) => write!(f, "Status '{}': {}", name, msg),
            ValidationError::Create(msg) => write!(f, "Create: {}", msg),
            ValidationError::Logging(msg) => write!(f, "Logging: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl DocketConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if !(1..=6).contains(&self.create.heading_level) {
            errors.push(ValidationError::Create(format!(
                "heading_level must be between 1 and 6, got {}",
                self.create.heading_level
            )));
        }

        let mut seen = HashSet::new();
        for entry in &self.statuses {
            if entry.canonical.trim().is_empty() {
                errors.push(ValidationError::Status(
                    entry.canonical.clone(),
                    "canonical name cannot be empty".to_string(),
                ));
                continue;
            }
            if entry.representations.is_empty() {
                errors.push(ValidationError::Status(
                    entry.canonical.clone(),
                    "at least one representation is required".to_string(),
                ));
            }
            if entry.representations.iter().any(|r| r.is_empty()) {
                errors.push(ValidationError::Status(
                    entry.canonical.clone(),
                    "representations cannot be empty strings".to_string(),
                ));
            }
            if !seen.insert(entry.canonical.as_str()) {
                errors.push(ValidationError::Status(
                    entry.canonical.clone(),
                    "defined more than once".to_string(),
                ));
            }
        }

        if let Err(e) = validate_logging(&self.logging) {
            errors.push(ValidationError::Logging(e.to_string()));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Status map described by `statuses`, or the built-in one.
    pub fn status_map(&self) -> StatusMap {
        if self.statuses.is_empty() {
            return StatusMap::default();
        }
        StatusMap::from_raw(
            self.statuses
                .iter()
                .map(|entry| (entry.canonical.clone(), entry.representations.clone())),
        )
    }

    /// Render as TOML.
    pub fn to_toml(&self) -> Result<String, DocketError> {
        toml::to_string_pretty(self).map_err(|e| DocketError::Serialization(e.to_string()))
    }
}
