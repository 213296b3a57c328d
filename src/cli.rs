//! CLI domain: parse, route, help, output, and presentation only.
//! No engine logic; a single route table dispatches to the library.

mod help;
mod output;
mod parse;
mod presentation;
mod route;

pub use help::{command_name, is_mutating};
pub use output::map_error;
pub use parse::{Cli, Commands};
pub use presentation::{
    format_entity_list, format_entity_show, format_scan_result, format_section_heading,
    format_tasks, format_triggers,
};
pub use route::RunContext;
