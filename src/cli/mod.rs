//! CLI command handlers
//!
//! Bridges the clap argument parsing in `expensectl` with the storage and
//! export layers.

pub mod exchange;
pub mod show;

pub use exchange::{handle_export_command, handle_import_command, ExportCommands, ImportCommands};
pub use show::handle_config_command;
