//! CLI route: single route table and run context. Dispatches to the engine and presentation.

use crate::cli::help::{command_name, is_mutating};
use crate::cli::parse::Commands;
use crate::cli::presentation::{
    format_entity_list, format_entity_show, format_scan_result, format_tasks, format_triggers,
};
use crate::config::{ConfigLoader, DocketConfig};
use crate::error::DocketError;
use crate::kv::KvFormat;
use crate::merge::MergeStore;
use crate::scanner::scan_directory;
use crate::trigger::parse_triggers;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, info_span};

/// Runtime context for CLI execution: resolved root and configuration.
pub struct RunContext {
    root: PathBuf,
    config: DocketConfig,
}

impl RunContext {
    /// Load configuration and resolve the root.
    ///
    /// An explicit `root` wins over the configured one, which wins over ".".
    pub fn new(root: Option<PathBuf>, config_path: Option<PathBuf>) -> Result<Self, DocketError> {
        let lookup_root = root.clone().unwrap_or_else(|| PathBuf::from("."));
        let config = match config_path {
            Some(ref path) => ConfigLoader::load_from_file(path)?,
            None => ConfigLoader::load(&lookup_root)?,
        };
        Self::with_config(root, config)
    }

    /// Build from an already loaded configuration.
    pub fn with_config(root: Option<PathBuf>, config: DocketConfig) -> Result<Self, DocketError> {
        config.validate().map_err(|errors| {
            let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            DocketError::Config(format!(
                "Configuration validation failed:\n{}",
                messages.join("\n")
            ))
        })?;

        let root = root
            .or_else(|| config.root.clone())
            .unwrap_or_else(|| PathBuf::from("."));
        debug!(root = %root.display(), "Run context ready");
        Ok(Self { root, config })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &DocketConfig {
        &self.config
    }

    /// Execute a CLI command via the single route table.
    pub fn execute(&self, command: &Commands) -> Result<String, DocketError> {
        let span = info_span!("command", name = command_name(command));
        let _guard = span.enter();

        let result = self.execute_inner(command);
        match &result {
            Ok(_) if is_mutating(command) => info!("Documents updated"),
            Ok(_) => debug!("Command completed"),
            Err(e) => debug!(error = %e, "Command failed"),
        }
        result
    }

    fn execute_inner(&self, command: &Commands) -> Result<String, DocketError> {
        match command {
            Commands::Scan { format } => {
                let files = scan_directory(&self.root)?;
                format_scan_result(&files, &self.root, format)
            }
            Commands::List { format, roots } => {
                let store = self.load_store()?;
                let entities = if *roots { store.roots() } else { store.all() };
                format_entity_list(&entities, &self.root, format)
            }
            Commands::Show { name, format } => {
                let store = self.load_store()?;
                let entity = store
                    .get(name)
                    .ok_or_else(|| DocketError::EntityNotFound(name.clone()))?;
                format_entity_show(entity, &self.root, format)
            }
            Commands::Set { name, field, value } => self.handle_set(name, field, value),
            Commands::Create {
                name,
                title,
                file,
                fields,
                level,
                kv_format,
            } => self.handle_create(
                name,
                title.as_deref().unwrap_or(name),
                file,
                fields,
                *level,
                *kv_format,
            ),
            Commands::Triggers { file, format } => {
                let path = self.resolve(file);
                let text = std::fs::read_to_string(&path).map_err(|e| DocketError::io(&path, e))?;
                let blocks = parse_triggers(&text)?;
                format_triggers(&blocks, format)
            }
            Commands::Tasks => {
                let store = self.load_store()?;
                format_tasks(&store.task_tree())
            }
            Commands::Config => self.config.to_toml(),
        }
    }

    fn load_store(&self) -> Result<MergeStore, DocketError> {
        let mut store = MergeStore::with_status_map(self.config.status_map());
        store.load_directory(&self.root)?;
        Ok(store)
    }

    /// Relative paths are taken from the root.
    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    fn handle_set(&self, name: &str, field: &str, value: &str) -> Result<String, DocketError> {
        let mut store = self.load_store()?;
        store.set_field(name, field, value)?;
        let written = store.write_back_entity(name)?;

        let target = match written {
            Some(path) => path.display().to_string(),
            None => "file missing, not written".to_string(),
        };
        Ok(format!("Set {}.{} = {} ({})", name, field, value, target))
    }

    fn handle_create(
        &self,
        name: &str,
        title: &str,
        file: &Path,
        raw_fields: &[String],
        level: Option<u8>,
        kv_format: Option<KvFormat>,
    ) -> Result<String, DocketError> {
        let fields = parse_field_args(raw_fields)?;
        let level = level.unwrap_or(self.config.create.heading_level);
        if !(1..=6).contains(&level) {
            return Err(DocketError::InvalidArgument(format!(
                "heading level must be between 1 and 6, got {}",
                level
            )));
        }

        let mut store = self.load_store()?;
        if store.get(name).is_some() {
            return Err(DocketError::InvalidArgument(format!(
                "Entity '{}' already exists",
                name
            )));
        }

        let target = self.resolve(file);
        store.create_entity(
            name,
            title,
            &fields,
            &target,
            level,
            kv_format.unwrap_or(self.config.create.format),
        )?;
        Ok(format!("Created {} in {}", name, target.display()))
    }
}

/// Parse repeated `key=value` arguments.
fn parse_field_args(raw: &[String]) -> Result<HashMap<String, String>, DocketError> {
    raw.iter()
        .map(|arg| match arg.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() => {
                Ok((key.trim().to_string(), value.trim().to_string()))
            }
            _ => Err(DocketError::InvalidArgument(format!(
                "Expected KEY=VALUE, got '{}'",
                arg
            ))),
        })
        .collect()
}
