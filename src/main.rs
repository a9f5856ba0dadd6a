use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use expense_store::cli::{
    handle_config_command, handle_export_command, handle_import_command, ExportCommands,
    ImportCommands,
};
use expense_store::config::{logging::init_logging, SystemConfig};
use expense_store::storage::{initialize_storage_with, Storage};

#[derive(Parser)]
#[command(
    name = "expensectl",
    version,
    about = "Inspect, export and import an expense store",
    long_about = "expensectl opens the expense store selected by the STORAGE_* \
                  environment variables and lets you inspect its configuration \
                  or move data in and out as CSV or JSON backups."
)]
struct Cli {
    /// Log level filter (RUST_LOG takes precedence)
    #[arg(long, env = "EXPENSE_LOG_LEVEL", default_value = "info", global = true)]
    log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show backend settings and the stored configuration
    Config,

    /// Export data
    #[command(subcommand)]
    Export(ExportCommands),

    /// Import data
    #[command(subcommand)]
    Import(ImportCommands),
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level, cli.json_logs)?;

    let system = SystemConfig::from_env();
    let storage = initialize_storage_with(&system)
        .with_context(|| format!("failed to open {} store", system.storage_type))?;

    let result = match cli.command {
        Commands::Config => handle_config_command(&system, &storage),
        Commands::Export(cmd) => handle_export_command(&storage, cmd),
        Commands::Import(cmd) => handle_import_command(&storage, cmd),
    };

    storage.close()?;
    result?;
    Ok(())
}
