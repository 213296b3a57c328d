//! Workspace config file source: <root>/.docket/config.toml

use config::builder::DefaultState;
use config::{ConfigBuilder, ConfigError, File};
use std::path::{Path, PathBuf};
use tracing::debug;

pub fn workspace_config_path(root: &Path) -> PathBuf {
    root.join(".docket").join("config.toml")
}

/// Add the workspace config file to builder if it exists.
pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
    root: &Path,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let path = workspace_config_path(root);
    if !path.exists() {
        return Ok(builder);
    }
    debug!(config_path = %path.display(), "Using workspace configuration");
    Ok(builder.add_source(File::from(path.as_path()).required(false)))
}
