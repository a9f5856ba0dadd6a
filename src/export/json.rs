//! JSON backup and restore
//!
//! A backup carries every expense, the recurring templates and the scalar
//! config fields in one versioned document.

use std::collections::HashSet;
use std::io::{Read, Write};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{ExpenseError, ExpenseResult};
use crate::models::{Expense, RecurringExpense};
use crate::storage::Storage;

/// Current backup document version
pub const BACKUP_VERSION: u32 = 1;

/// Full backup document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Backup {
    /// Document version for compatibility checking
    pub version: u32,

    /// When the backup was taken
    pub export_date: DateTime<Utc>,

    /// All expenses
    pub expenses: Vec<Expense>,

    /// Scalar configuration
    pub config: BackupConfig,

    /// All recurring templates
    #[serde(default)]
    pub recurring_expenses: Vec<RecurringExpense>,
}

/// Configuration section of a backup; absent fields are left alone on restore
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<u32>,
}

/// Outcome of a restore
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreSummary {
    pub expenses_restored: usize,
    pub expenses_skipped: usize,
    pub recurring_restored: usize,
    pub recurring_skipped: usize,
}

impl Backup {
    /// Snapshot the current contents of a store
    pub fn from_storage<S: Storage + ?Sized>(storage: &S) -> ExpenseResult<Self> {
        let config = storage.get_config()?;

        Ok(Self {
            version: BACKUP_VERSION,
            export_date: Utc::now(),
            expenses: storage.get_all_expenses()?,
            config: BackupConfig {
                categories: Some(config.categories),
                currency: Some(config.currency),
                start_date: Some(config.start_date),
            },
            recurring_expenses: config.recurring_expenses,
        })
    }
}

/// Write a backup of the store
pub fn export_backup<S, W>(storage: &S, writer: W) -> ExpenseResult<Backup>
where
    S: Storage + ?Sized,
    W: Write,
{
    let backup = Backup::from_storage(storage)?;
    serde_json::to_writer_pretty(writer, &backup)
        .map_err(|e| ExpenseError::Export(e.to_string()))?;

    info!(
        expenses = backup.expenses.len(),
        recurring = backup.recurring_expenses.len(),
        "Exported backup"
    );
    Ok(backup)
}

/// Parse a backup document
pub fn read_backup<R: Read>(reader: R) -> ExpenseResult<Backup> {
    let backup: Backup = serde_json::from_reader(reader)
        .map_err(|e| ExpenseError::Import(format!("Invalid backup: {}", e)))?;

    if backup.version != BACKUP_VERSION {
        return Err(ExpenseError::Import(format!(
            "Unsupported backup version: expected {}, got {}",
            BACKUP_VERSION, backup.version
        )));
    }
    Ok(backup)
}

/// Restore a backup into the store
///
/// Config fields present in the backup overwrite the stored ones. Templates
/// and expenses are merged: records whose id is already stored are skipped.
pub fn restore_backup<S, R>(storage: &S, reader: R) -> ExpenseResult<RestoreSummary>
where
    S: Storage + ?Sized,
    R: Read,
{
    let backup = read_backup(reader)?;
    let mut summary = RestoreSummary::default();

    if let Some(categories) = &backup.config.categories {
        storage.update_categories(categories)?;
    }
    if let Some(currency) = &backup.config.currency {
        storage.update_currency(currency)?;
    }
    if let Some(day) = backup.config.start_date {
        storage.update_start_date(day)?;
    }

    let known: HashSet<String> = storage
        .get_recurring_expenses()?
        .into_iter()
        .map(|t| t.id)
        .collect();
    for template in backup.recurring_expenses {
        if !template.id.is_empty() && known.contains(&template.id) {
            summary.recurring_skipped += 1;
            continue;
        }
        storage.add_recurring_expense(template)?;
        summary.recurring_restored += 1;
    }

    let known: HashSet<String> = storage
        .get_all_expenses()?
        .into_iter()
        .map(|e| e.id)
        .collect();
    let (skipped, fresh): (Vec<_>, Vec<_>) = backup
        .expenses
        .into_iter()
        .partition(|e| !e.id.is_empty() && known.contains(&e.id));
    summary.expenses_skipped = skipped.len();
    if !fresh.is_empty() {
        summary.expenses_restored = storage.add_multiple_expenses(fresh)?.len();
    }

    info!(
        expenses = summary.expenses_restored,
        recurring = summary.recurring_restored,
        "Restored backup"
    );
    Ok(summary)
}
