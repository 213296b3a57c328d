//! CLI command-name contract for logging and routing.

use crate::cli::parse::Commands;

/// Command name string recorded on the command span (e.g. "list", "set").
pub fn command_name(command: &Commands) -> &'static str {
    match command {
        Commands::Scan { .. } => "scan",
        Commands::List { .. } => "list",
        Commands::Show { .. } => "show",
        Commands::Set { .. } => "set",
        Commands::Create { .. } => "create",
        Commands::Triggers { .. } => "triggers",
        Commands::Tasks => "tasks",
        Commands::Config => "config",
    }
}

/// Whether the command writes to documents.
pub fn is_mutating(command: &Commands) -> bool {
    matches!(command, Commands::Set { .. } | Commands::Create { .. })
}
