//! Error types for the docket entity engine.

use std::path::PathBuf;
use thiserror::Error;

/// Trigger DSL parse errors
///
/// Every variant carries the fragment that could not be parsed so the
/// message points at the offending text.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TriggerError {
    #[error("Unknown condition: '{0}'")]
    UnknownCondition(String),

    #[error("Missing ')' in {func} call")]
    MissingParen { func: String },

    #[error("Expected '{prefix}' prefix")]
    ExpectedPrefix { prefix: String },

    #[error("Expected comma separating arguments in '{0}'")]
    MissingComma(String),

    #[error("Expected quoted string, got '{0}'")]
    ExpectedQuoted(String),

    #[error("Invalid {what}: '{value}'")]
    InvalidInteger { what: String, value: String },

    #[error("Expected {expected} after {func}({agent}), got '{found}'")]
    ExpectedOperator {
        func: String,
        agent: String,
        expected: String,
        found: String,
    },

    #[error("Missing state after status({agent}) ==")]
    MissingState { agent: String },

    #[error("'then' without preceding condition: '{line}'")]
    ThenWithoutCondition { line: String },
}

/// Engine errors
#[derive(Debug, Error)]
pub enum DocketError {
    #[error("Entity '{0}' not found")]
    EntityNotFound(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Trigger parse error: {0}")]
    Trigger(#[from] TriggerError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl DocketError {
    /// Wrap an I/O error with the path it happened on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DocketError::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<config::ConfigError> for DocketError {
    fn from(err: config::ConfigError) -> Self {
        DocketError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for DocketError {
    fn from(err: serde_json::Error) -> Self {
        DocketError::Serialization(err.to_string())
    }
}
