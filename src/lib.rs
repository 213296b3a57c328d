//! Docket: structured entities from plain markdown
//!
//! Recognizes marker conventions in markdown documents (a YAML preamble,
//! status glyphs in headings, key-value lines) and turns them into a typed
//! entity model. Entities with the same name in several documents are merged
//! field by field, newest modification time winning, and edits are written
//! back into the owning document without disturbing the surrounding text.
//! The `trigger` module parses the small if/elif/else rule language used to
//! describe automated reactions.

pub mod cli;
pub mod config;
pub mod entity;
pub mod error;
pub mod frontmatter;
pub mod kv;
pub mod logging;
pub mod merge;
pub mod scanner;
pub mod status;
pub mod trigger;
pub mod types;
