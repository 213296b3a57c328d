//! Merge rules: defaults, override order, conflict handling.

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment};

/// Create a Config builder with merge policy defaults applied.
pub fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("create.heading_level", 2)?
        .set_default("create.format", "kv-colons")?
        .set_default("logging.level", "warn")?
        .set_default("logging.format", "text")?
        .set_default("logging.output", "stderr")
}

/// Environment overrides: `DOCKET__CREATE__HEADING_LEVEL=3` sets
/// `create.heading_level`. Applied last, so it wins over every file.
pub fn environment() -> Environment {
    Environment::with_prefix("DOCKET")
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}
