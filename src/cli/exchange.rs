//! CLI commands for data exchange
//!
//! Export writes to a file or stdout; import reads from a file.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use clap::Subcommand;

use crate::error::{ExpenseError, ExpenseResult};
use crate::export::{csv, json};
use crate::storage::Storage;

/// Export subcommands
#[derive(Subcommand, Debug)]
pub enum ExportCommands {
    /// Export expenses to CSV
    Csv {
        /// Output file path (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Export a full JSON backup
    Json {
        /// Output file path (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Import subcommands
#[derive(Subcommand, Debug)]
pub enum ImportCommands {
    /// Import expenses from CSV
    Csv {
        /// Path to CSV file
        file: PathBuf,
    },

    /// Restore a JSON backup
    Json {
        /// Path to backup file
        file: PathBuf,
    },
}

/// Handle export commands
pub fn handle_export_command<S: Storage + ?Sized>(
    storage: &S,
    cmd: ExportCommands,
) -> ExpenseResult<()> {
    match cmd {
        ExportCommands::Csv { output } => {
            let mut writer = open_output(output.as_deref())?;
            let count = csv::export_expenses_csv(storage, &mut writer)?;
            finish_output(writer)?;
            if let Some(path) = output {
                println!("Exported {} expenses to: {}", count, path.display());
            }
        }
        ExportCommands::Json { output } => {
            let mut writer = open_output(output.as_deref())?;
            let backup = json::export_backup(storage, &mut writer)?;
            if output.is_none() {
                writeln!(writer).map_err(|e| ExpenseError::Export(e.to_string()))?;
            }
            finish_output(writer)?;
            if let Some(path) = output {
                println!(
                    "Backup with {} expenses and {} recurring expenses written to: {}",
                    backup.expenses.len(),
                    backup.recurring_expenses.len(),
                    path.display()
                );
            }
        }
    }

    Ok(())
}

/// Handle import commands
pub fn handle_import_command<S: Storage + ?Sized>(
    storage: &S,
    cmd: ImportCommands,
) -> ExpenseResult<()> {
    match cmd {
        ImportCommands::Csv { file } => {
            let summary = csv::import_expenses_csv(storage, open_input(&file)?)?;
            println!("Processed: {}", summary.processed);
            println!("Imported:  {}", summary.imported);
            println!("Skipped:   {}", summary.skipped);
            if !summary.new_categories.is_empty() {
                println!("New categories: {}", summary.new_categories.join(", "));
            }
        }
        ImportCommands::Json { file } => {
            let summary = json::restore_backup(storage, open_input(&file)?)?;
            println!(
                "Restored {} expenses ({} already present)",
                summary.expenses_restored, summary.expenses_skipped
            );
            println!(
                "Restored {} recurring expenses ({} already present)",
                summary.recurring_restored, summary.recurring_skipped
            );
        }
    }

    Ok(())
}

fn open_input(path: &Path) -> ExpenseResult<BufReader<File>> {
    let file = File::open(path).map_err(|e| {
        ExpenseError::Import(format!("Failed to open file {}: {}", path.display(), e))
    })?;
    Ok(BufReader::new(file))
}

fn open_output(path: Option<&Path>) -> ExpenseResult<Box<dyn Write>> {
    match path {
        Some(path) => {
            let file = File::create(path).map_err(|e| {
                ExpenseError::Export(format!("Failed to create file {}: {}", path.display(), e))
            })?;
            Ok(Box::new(BufWriter::new(file)))
        }
        None => Ok(Box::new(io::stdout().lock())),
    }
}

fn finish_output(mut writer: Box<dyn Write>) -> ExpenseResult<()> {
    writer
        .flush()
        .map_err(|e| ExpenseError::Export(format!("Failed to flush output: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DataPaths;
    use crate::models::{Config, Expense};
    use crate::storage::JsonStore;
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    fn create_test_storage(dir: &Path) -> JsonStore {
        JsonStore::open_with(DataPaths::new(dir), || Ok(Config::default())).unwrap()
    }

    #[test]
    fn test_export_then_import_files() {
        let temp_dir = TempDir::new().unwrap();
        let source = create_test_storage(&temp_dir.path().join("source"));
        let date = Utc.with_ymd_and_hms(2025, 4, 1, 0, 0, 0).unwrap();
        source
            .add_expense(Expense::new("Book", "Shopping", 12.0, date))
            .unwrap();

        let csv_path = temp_dir.path().join("out.csv");
        let json_path = temp_dir.path().join("out.json");
        handle_export_command(&source, ExportCommands::Csv { output: Some(csv_path.clone()) })
            .unwrap();
        handle_export_command(&source, ExportCommands::Json { output: Some(json_path.clone()) })
            .unwrap();

        let from_csv = create_test_storage(&temp_dir.path().join("from_csv"));
        handle_import_command(&from_csv, ImportCommands::Csv { file: csv_path }).unwrap();
        assert_eq!(from_csv.get_all_expenses().unwrap().len(), 1);

        let from_json = create_test_storage(&temp_dir.path().join("from_json"));
        handle_import_command(&from_json, ImportCommands::Json { file: json_path }).unwrap();
        assert_eq!(
            from_json.get_all_expenses().unwrap(),
            source.get_all_expenses().unwrap()
        );
    }

    #[test]
    fn test_import_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let storage = create_test_storage(temp_dir.path());

        let err = handle_import_command(
            &storage,
            ImportCommands::Csv {
                file: temp_dir.path().join("nope.csv"),
            },
        )
        .unwrap_err();
        assert!(matches!(err, ExpenseError::Import(_)));
    }
}
