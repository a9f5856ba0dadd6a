//! JSON document store
//!
//! Keeps `config.json` and `expenses.json` in one directory. The whole state
//! lives in memory behind a `RwLock`; a mutation clones it, applies the
//! change, rewrites the documents that changed as one batch and only then
//! swaps the new state in, all while holding the write guard.

use std::collections::HashSet;
use std::path::Path;
use std::sync::RwLock;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::config::{resolve_base_config, DataPaths};
use crate::error::{ExpenseError, ExpenseResult};
use crate::models::{Config, Expense, RecurringExpense};
use crate::validation;

use super::file_io::{load_document, write_document, DocumentBatch};
use super::{prepare_expense, prepare_recurring, sort_expenses, sort_recurring, Storage};

/// `expenses.json` as read from disk
#[derive(Debug, Default, serde::Deserialize)]
struct ExpenseData {
    #[serde(default)]
    expenses: Vec<Expense>,
}

/// `expenses.json` as written
#[derive(serde::Serialize)]
struct ExpenseDocument<'a> {
    expenses: &'a [Expense],
}

/// In-memory copy of both documents
#[derive(Debug, Clone)]
struct JsonState {
    config: Config,
    expenses: Vec<Expense>,
}

/// Store backed by JSON files in a data directory
pub struct JsonStore {
    paths: DataPaths,
    state: RwLock<Option<JsonState>>,
}

impl JsonStore {
    /// Open (or create) a store in `dir`
    ///
    /// A missing `config.json` is created from the resolved base config.
    pub fn open(dir: impl AsRef<Path>) -> ExpenseResult<Self> {
        Self::open_with(DataPaths::new(dir.as_ref()), resolve_base_config)
    }

    /// Open a store, seeding a missing config from `seed`
    pub fn open_with<F>(paths: DataPaths, seed: F) -> ExpenseResult<Self>
    where
        F: FnOnce() -> ExpenseResult<Config>,
    {
        paths.ensure_directories()?;

        if !paths.is_initialized() {
            let config = seed()?;
            write_document(&paths.config_file(), &config)?;
            info!(path = %paths.config_file().display(), "Created config document");
        }

        let config: Config = load_document(&paths.config_file())?.ok_or_else(|| {
            ExpenseError::Storage(format!("Missing {}", paths.config_file().display()))
        })?;
        let data: ExpenseData = load_document(&paths.expenses_file())?.unwrap_or_default();

        info!(
            dir = %paths.data_dir().display(),
            expenses = data.expenses.len(),
            recurring = config.recurring_expenses.len(),
            "Opened JSON store"
        );

        Ok(Self {
            paths,
            state: RwLock::new(Some(JsonState {
                config,
                expenses: data.expenses,
            })),
        })
    }

    /// The directory layout this store writes to
    pub fn paths(&self) -> &DataPaths {
        &self.paths
    }

    fn read<T, F>(&self, f: F) -> ExpenseResult<T>
    where
        F: FnOnce(&JsonState) -> ExpenseResult<T>,
    {
        let guard = self.state.read().map_err(|e| {
            ExpenseError::Storage(format!("Failed to acquire read lock: {}", e))
        })?;
        let state = guard.as_ref().ok_or_else(closed)?;
        f(state)
    }

    fn write<T, F>(&self, f: F) -> ExpenseResult<T>
    where
        F: FnOnce(&mut JsonState) -> ExpenseResult<T>,
    {
        let mut guard = self.state.write().map_err(|e| {
            ExpenseError::Storage(format!("Failed to acquire write lock: {}", e))
        })?;
        let current = guard.as_ref().ok_or_else(closed)?;

        let mut next = current.clone();
        let result = f(&mut next)?;

        let config = (next.config != current.config).then_some(&next.config);
        let expenses = (next.expenses != current.expenses).then_some(next.expenses.as_slice());
        if let Err(err) = self.stage(config, expenses)?.commit() {
            self.restore(current);
            return Err(err);
        }

        *guard = Some(next);
        Ok(result)
    }

    /// Stage the given documents; nothing on disk changes if this fails
    fn stage(
        &self,
        config: Option<&Config>,
        expenses: Option<&[Expense]>,
    ) -> ExpenseResult<DocumentBatch> {
        let mut batch = DocumentBatch::default();
        if let Some(config) = config {
            batch.stage(&self.paths.config_file(), config)?;
        }
        if let Some(expenses) = expenses {
            batch.stage(&self.paths.expenses_file(), &ExpenseDocument { expenses })?;
        }
        Ok(batch)
    }

    /// Rewrite both documents from `state` after a commit failed part way
    fn restore(&self, state: &JsonState) {
        let restored = self
            .stage(Some(&state.config), Some(state.expenses.as_slice()))
            .and_then(DocumentBatch::commit);
        if let Err(err) = restored {
            warn!(
                dir = %self.paths.data_dir().display(),
                error = %err,
                "Failed to restore store documents"
            );
        }
    }
}

fn closed() -> ExpenseError {
    ExpenseError::Storage("store is closed".into())
}

fn insert_expense(state: &mut JsonState, expense: &Expense) -> ExpenseResult<Expense> {
    let prepared = prepare_expense(expense, &state.config.currency)?;
    if state.expenses.iter().any(|e| e.id == prepared.id) {
        return Err(ExpenseError::duplicate_expense(prepared.id));
    }
    state.expenses.push(prepared.clone());
    Ok(prepared)
}

impl Storage for JsonStore {
    fn close(&self) -> ExpenseResult<()> {
        let mut guard = self.state.write().map_err(|e| {
            ExpenseError::Storage(format!("Failed to acquire write lock: {}", e))
        })?;
        if guard.take().is_some() {
            info!(dir = %self.paths.data_dir().display(), "Closed JSON store");
        }
        Ok(())
    }

    fn get_config(&self) -> ExpenseResult<Config> {
        self.read(|state| {
            let mut config = state.config.clone();
            sort_recurring(&mut config.recurring_expenses);
            Ok(config)
        })
    }

    fn update_categories(&self, categories: &[String]) -> ExpenseResult<()> {
        let categories = validation::validate_categories(categories)?;
        self.write(|state| {
            state.config.categories = categories;
            Ok(())
        })?;
        debug!("Updated categories");
        Ok(())
    }

    fn update_currency(&self, currency: &str) -> ExpenseResult<()> {
        let currency = validation::validate_currency(currency)?;
        self.write(|state| {
            state.config.currency = currency;
            Ok(())
        })?;
        debug!("Updated currency");
        Ok(())
    }

    fn update_start_date(&self, day: u32) -> ExpenseResult<()> {
        let day = validation::validate_start_date(i64::from(day))?;
        self.write(|state| {
            state.config.start_date = day;
            Ok(())
        })?;
        debug!(day, "Updated start date");
        Ok(())
    }

    fn get_recurring_expenses(&self) -> ExpenseResult<Vec<RecurringExpense>> {
        self.read(|state| {
            let mut templates = state.config.recurring_expenses.clone();
            sort_recurring(&mut templates);
            Ok(templates)
        })
    }

    fn get_recurring_expense(&self, id: &str) -> ExpenseResult<RecurringExpense> {
        self.read(|state| {
            state
                .config
                .recurring_expenses
                .iter()
                .find(|t| t.id == id)
                .cloned()
                .ok_or_else(|| ExpenseError::recurring_expense_not_found(id))
        })
    }

    fn add_recurring_expense(&self, template: RecurringExpense) -> ExpenseResult<RecurringExpense> {
        let stored = self.write(|state| {
            let prepared = prepare_recurring(&template, &state.config.currency)?;
            if state
                .config
                .recurring_expenses
                .iter()
                .any(|t| t.id == prepared.id)
            {
                return Err(ExpenseError::duplicate_recurring_expense(prepared.id));
            }
            state.config.recurring_expenses.push(prepared.clone());
            Ok(prepared)
        })?;
        debug!(id = %stored.id, "Added recurring expense");
        Ok(stored)
    }

    fn remove_recurring_expense(&self, id: &str, remove_all: bool) -> ExpenseResult<()> {
        let removed = self.write(|state| {
            let index = state
                .config
                .recurring_expenses
                .iter()
                .position(|t| t.id == id)
                .ok_or_else(|| ExpenseError::recurring_expense_not_found(id))?;
            let template = state.config.recurring_expenses.remove(index);

            let now = Utc::now();
            let before = state.expenses.len();
            state
                .expenses
                .retain(|e| !template.reaches(e, remove_all, now));
            Ok(before - state.expenses.len())
        })?;
        debug!(id, removed, "Removed recurring expense");
        Ok(())
    }

    fn update_recurring_expense(
        &self,
        id: &str,
        template: RecurringExpense,
        update_all: bool,
    ) -> ExpenseResult<()> {
        let updated = self.write(|state| {
            let mut prepared = prepare_recurring(&template, &state.config.currency)?;
            prepared.id = id.to_string();

            let slot = state
                .config
                .recurring_expenses
                .iter_mut()
                .find(|t| t.id == id)
                .ok_or_else(|| ExpenseError::recurring_expense_not_found(id))?;
            *slot = prepared.clone();

            let now = Utc::now();
            let mut updated = 0usize;
            for expense in state.expenses.iter_mut() {
                if prepared.reaches(expense, update_all, now) {
                    prepared.apply_to(expense);
                    updated += 1;
                }
            }
            Ok(updated)
        })?;
        debug!(id, updated, "Updated recurring expense");
        Ok(())
    }

    fn get_all_expenses(&self) -> ExpenseResult<Vec<Expense>> {
        self.read(|state| {
            let mut expenses = state.expenses.clone();
            sort_expenses(&mut expenses);
            Ok(expenses)
        })
    }

    fn get_expense(&self, id: &str) -> ExpenseResult<Expense> {
        self.read(|state| {
            state
                .expenses
                .iter()
                .find(|e| e.id == id)
                .cloned()
                .ok_or_else(|| ExpenseError::expense_not_found(id))
        })
    }

    fn add_expense(&self, expense: Expense) -> ExpenseResult<Expense> {
        let stored = self.write(|state| insert_expense(state, &expense))?;
        debug!(id = %stored.id, "Added expense");
        Ok(stored)
    }

    fn add_multiple_expenses(&self, expenses: Vec<Expense>) -> ExpenseResult<Vec<Expense>> {
        // An error anywhere drops the cloned state, so nothing is persisted.
        let stored = self.write(|state| {
            expenses
                .iter()
                .map(|expense| insert_expense(state, expense))
                .collect::<ExpenseResult<Vec<_>>>()
        })?;
        debug!(count = stored.len(), "Added expenses");
        Ok(stored)
    }

    fn remove_expense(&self, id: &str) -> ExpenseResult<()> {
        self.write(|state| {
            let index = state
                .expenses
                .iter()
                .position(|e| e.id == id)
                .ok_or_else(|| ExpenseError::expense_not_found(id))?;
            state.expenses.remove(index);
            Ok(())
        })?;
        debug!(id, "Removed expense");
        Ok(())
    }

    fn remove_multiple_expenses(&self, ids: &[String]) -> ExpenseResult<()> {
        let wanted: HashSet<&str> = ids.iter().map(String::as_str).collect();
        let removed = self.write(|state| {
            let before = state.expenses.len();
            state.expenses.retain(|e| !wanted.contains(e.id.as_str()));
            Ok(before - state.expenses.len())
        })?;
        debug!(requested = ids.len(), removed, "Removed expenses");
        Ok(())
    }

    fn update_expense(&self, id: &str, expense: Expense) -> ExpenseResult<Expense> {
        let stored = self.write(|state| {
            let mut prepared = prepare_expense(&expense, &state.config.currency)?;
            let slot = state
                .expenses
                .iter_mut()
                .find(|e| e.id == id)
                .ok_or_else(|| ExpenseError::expense_not_found(id))?;

            prepared.id = id.to_string();
            prepared.recurring_id = slot.recurring_id.clone();
            *slot = prepared.clone();
            Ok(prepared)
        })?;
        debug!(id, "Updated expense");
        Ok(stored)
    }
}
