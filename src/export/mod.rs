//! Data exchange for expense-store
//!
//! - CSV: expense export and import (spreadsheet-compatible)
//! - JSON: full backup and restore

pub mod csv;
pub mod json;

pub use self::csv::{export_expenses_csv, import_expenses_csv, ImportSummary, CSV_HEADER};
pub use self::json::{
    export_backup, read_backup, restore_backup, Backup, BackupConfig, RestoreSummary,
    BACKUP_VERSION,
};
