//! CLI output: error mapping from domain errors to stable CLI surface.

use crate::error::DocketError;

/// Map domain errors to a string for CLI output.
pub fn map_error(e: &DocketError) -> String {
    match e {
        DocketError::EntityNotFound(name) => {
            format!("Entity '{}' not found. Run `docket list` to see known entities.", name)
        }
        other => other.to_string(),
    }
}
