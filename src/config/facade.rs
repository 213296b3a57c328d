//! Entry point for loading configuration.

use super::merge::merge_policy;
use super::sources::{global_file, workspace_file};
use super::DocketConfig;
use crate::error::DocketError;
use config::File;
use std::path::Path;
use tracing::debug;

/// Loads [`DocketConfig`] from its layered sources
pub struct ConfigLoader;

impl ConfigLoader {
    /// Defaults, global file, `<root>/.docket/config.toml`, environment.
    pub fn load(root: &Path) -> Result<DocketConfig, DocketError> {
        let builder = merge_policy::builder_with_defaults()?;
        let builder = global_file::add_to_builder(builder)?;
        let builder = workspace_file::add_to_builder(builder, root)?;
        let config = builder
            .add_source(merge_policy::environment())
            .build()?
            .try_deserialize::<DocketConfig>()?;

        debug!(root = %root.display(), statuses = config.statuses.len(), "Configuration loaded");
        Ok(config)
    }

    /// Defaults, then the given file (which must exist), then environment.
    pub fn load_from_file(path: &Path) -> Result<DocketConfig, DocketError> {
        if !path.is_file() {
            return Err(DocketError::Config(format!(
                "Configuration file not found: {}",
                path.display()
            )));
        }
        let config = merge_policy::builder_with_defaults()?
            .add_source(File::from(path))
            .add_source(merge_policy::environment())
            .build()?
            .try_deserialize::<DocketConfig>()?;

        debug!(path = %path.display(), "Configuration loaded from file");
        Ok(config)
    }

    /// Like [`ConfigLoader::load`], then validated.
    pub fn load_validated(root: &Path) -> Result<DocketConfig, DocketError> {
        let config = Self::load(root)?;
        check(&config)?;
        Ok(config)
    }
}

fn check(config: &DocketConfig) -> Result<(), DocketError> {
    config.validate().map_err(|errors| {
        let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        DocketError::Config(format!(
            "Configuration validation failed:\n{}",
            messages.join("\n")
        ))
    })
}
