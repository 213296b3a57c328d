//! CLI parse: clap types for Docket. No behavior; definitions only.

use crate::kv::KvFormat;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Docket CLI - structured entities from plain markdown
#[derive(Parser, Debug)]
#[command(name = "docket")]
#[command(about = "Read, merge and update structured entities in markdown documents")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Directory to scan for docket documents (default: config root or ".")
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// Configuration file path (overrides default config loading)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Disable logging entirely
    #[arg(long, short, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long, global = true)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file)
    #[arg(long, global = true)]
    pub log_output: Option<String>,

    /// Log file path (if output is "file")
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List docket documents under the root
    Scan {
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// List merged entities
    List {
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
        /// Only entities that are nobody's child
        #[arg(long)]
        roots: bool,
    },
    /// Show one entity with the provenance of each field
    Show {
        /// Entity name
        name: String,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Set a field and write it back to the entity's primary file
    Set {
        /// Entity name
        name: String,
        /// Field name (`status` updates the heading marker)
        field: String,
        /// New value
        value: String,
    },
    /// Append a new entity to a file
    Create {
        /// Entity name
        name: String,
        /// Entity title (defaults to the name)
        #[arg(long)]
        title: Option<String>,
        /// Target file, relative to the root unless absolute
        #[arg(long)]
        file: PathBuf,
        /// Field as key=value; repeatable
        #[arg(long = "field", value_name = "KEY=VALUE")]
        fields: Vec<String>,
        /// Heading level (default from config)
        #[arg(long)]
        level: Option<u8>,
        /// KV format: colons, packed, table, frontmatter (default from config)
        #[arg(long)]
        kv_format: Option<KvFormat>,
    },
    /// Parse trigger rules from a file
    Triggers {
        /// File containing if/elif/else rules
        file: PathBuf,
        /// Output format (text or json)
        #[arg(long, default_value = "json")]
        format: String,
    },
    /// Print the task tree as JSON
    Tasks,
    /// Print the resolved configuration as TOML
    Config,
}
