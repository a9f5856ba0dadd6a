//! Storage layer for expense-store
//!
//! One capability, [`Storage`], with two implementations: JSON documents on
//! disk and a PostgreSQL database. [`initialize_storage`] picks the backend
//! once from the environment and hands back a [`StorageBackend`].

pub mod file_io;
pub mod json_store;
#[cfg(feature = "postgres")]
pub mod postgres_store;

pub use file_io::{load_document, write_document, DocumentBatch};
pub use json_store::JsonStore;
#[cfg(feature = "postgres")]
pub use postgres_store::PostgresStore;

use std::cmp::Ordering;

use chrono::SubsecRound;
use tracing::info;
use uuid::Uuid;

use crate::config::{BackendType, SystemConfig};
use crate::error::{ExpenseError, ExpenseResult};
use crate::models::{Config, Expense, RecurringExpense};

/// Persistence capability shared by every backend
///
/// All operations are safe to call from multiple threads. Mutations validate
/// their input before touching persistent state.
pub trait Storage: Send + Sync {
    /// Release the backend; further calls fail with a storage error
    fn close(&self) -> ExpenseResult<()>;

    fn get_config(&self) -> ExpenseResult<Config>;

    fn get_categories(&self) -> ExpenseResult<Vec<String>> {
        Ok(self.get_config()?.categories)
    }

    fn update_categories(&self, categories: &[String]) -> ExpenseResult<()>;

    fn get_currency(&self) -> ExpenseResult<String> {
        Ok(self.get_config()?.currency)
    }

    fn update_currency(&self, currency: &str) -> ExpenseResult<()>;

    fn get_start_date(&self) -> ExpenseResult<u32> {
        Ok(self.get_config()?.start_date)
    }

    fn update_start_date(&self, day: u32) -> ExpenseResult<()>;

    /// Templates ordered by start date, then id
    fn get_recurring_expenses(&self) -> ExpenseResult<Vec<RecurringExpense>>;

    fn get_recurring_expense(&self, id: &str) -> ExpenseResult<RecurringExpense>;

    /// Store a new template and return it as stored
    fn add_recurring_expense(&self, template: RecurringExpense) -> ExpenseResult<RecurringExpense>;

    /// Delete a template and its children (all, or only future-dated ones)
    fn remove_recurring_expense(&self, id: &str, remove_all: bool) -> ExpenseResult<()>;

    /// Replace a template and push its fields to its children
    fn update_recurring_expense(
        &self,
        id: &str,
        template: RecurringExpense,
        update_all: bool,
    ) -> ExpenseResult<()>;

    /// Expenses ordered newest first, ties by id
    fn get_all_expenses(&self) -> ExpenseResult<Vec<Expense>>;

    fn get_expense(&self, id: &str) -> ExpenseResult<Expense>;

    /// Store a new expense and return it as stored
    fn add_expense(&self, expense: Expense) -> ExpenseResult<Expense>;

    /// Store a batch of expenses; nothing is written if any record is rejected
    fn add_multiple_expenses(&self, expenses: Vec<Expense>) -> ExpenseResult<Vec<Expense>>;

    fn remove_expense(&self, id: &str) -> ExpenseResult<()>;

    /// Delete every listed expense; unknown ids are ignored
    fn remove_multiple_expenses(&self, ids: &[String]) -> ExpenseResult<()>;

    /// Replace a stored expense, keeping its recurring link
    fn update_expense(&self, id: &str, expense: Expense) -> ExpenseResult<Expense>;
}

/// The backend selected at startup
pub enum StorageBackend {
    Json(JsonStore),
    #[cfg(feature = "postgres")]
    Postgres(PostgresStore),
}

impl StorageBackend {
    /// Which backend this is
    pub fn backend_type(&self) -> BackendType {
        match self {
            Self::Json(_) => BackendType::Json,
            #[cfg(feature = "postgres")]
            Self::Postgres(_) => BackendType::Postgres,
        }
    }
}

macro_rules! dispatch {
    ($self:ident, $store:ident => $call:expr) => {
        match $self {
            StorageBackend::Json($store) => $call,
            #[cfg(feature = "postgres")]
            StorageBackend::Postgres($store) => $call,
        }
    };
}

impl Storage for StorageBackend {
    fn close(&self) -> ExpenseResult<()> {
        dispatch!(self, store => store.close())
    }

    fn get_config(&self) -> ExpenseResult<Config> {
        dispatch!(self, store => store.get_config())
    }

    fn get_categories(&self) -> ExpenseResult<Vec<String>> {
        dispatch!(self, store => store.get_categories())
    }

    fn update_categories(&self, categories: &[String]) -> ExpenseResult<()> {
        dispatch!(self, store => store.update_categories(categories))
    }

    fn get_currency(&self) -> ExpenseResult<String> {
        dispatch!(self, store => store.get_currency())
    }

    fn update_currency(&self, currency: &str) -> ExpenseResult<()> {
        dispatch!(self, store => store.update_currency(currency))
    }

    fn get_start_date(&self) -> ExpenseResult<u32> {
        dispatch!(self, store => store.get_start_date())
    }

    fn update_start_date(&self, day: u32) -> ExpenseResult<()> {
        dispatch!(self, store => store.update_start_date(day))
    }

    fn get_recurring_expenses(&self) -> ExpenseResult<Vec<RecurringExpense>> {
        dispatch!(self, store => store.get_recurring_expenses())
    }

    fn get_recurring_expense(&self, id: &str) -> ExpenseResult<RecurringExpense> {
        dispatch!(self, store => store.get_recurring_expense(id))
    }

    fn add_recurring_expense(&self, template: RecurringExpense) -> ExpenseResult<RecurringExpense> {
        dispatch!(self, store => store.add_recurring_expense(template))
    }

    fn remove_recurring_expense(&self, id: &str, remove_all: bool) -> ExpenseResult<()> {
        dispatch!(self, store => store.remove_recurring_expense(id, remove_all))
    }

    fn update_recurring_expense(
        &self,
        id: &str,
        template: RecurringExpense,
        update_all: bool,
    ) -> ExpenseResult<()> {
        dispatch!(self, store => store.update_recurring_expense(id, template, update_all))
    }

    fn get_all_expenses(&self) -> ExpenseResult<Vec<Expense>> {
        dispatch!(self, store => store.get_all_expenses())
    }

    fn get_expense(&self, id: &str) -> ExpenseResult<Expense> {
        dispatch!(self, store => store.get_expense(id))
    }

    fn add_expense(&self, expense: Expense) -> ExpenseResult<Expense> {
        dispatch!(self, store => store.add_expense(expense))
    }

    fn add_multiple_expenses(&self, expenses: Vec<Expense>) -> ExpenseResult<Vec<Expense>> {
        dispatch!(self, store => store.add_multiple_expenses(expenses))
    }

    fn remove_expense(&self, id: &str) -> ExpenseResult<()> {
        dispatch!(self, store => store.remove_expense(id))
    }

    fn remove_multiple_expenses(&self, ids: &[String]) -> ExpenseResult<()> {
        dispatch!(self, store => store.remove_multiple_expenses(ids))
    }

    fn update_expense(&self, id: &str, expense: Expense) -> ExpenseResult<Expense> {
        dispatch!(self, store => store.update_expense(id, expense))
    }
}

/// Construct the backend named by the process environment
pub fn initialize_storage() -> ExpenseResult<StorageBackend> {
    initialize_storage_with(&SystemConfig::from_env())
}

/// Construct the backend named by `system`
pub fn initialize_storage_with(system: &SystemConfig) -> ExpenseResult<StorageBackend> {
    info!(backend = %system.storage_type, "Initializing storage");

    match system.storage_type {
        BackendType::Json => Ok(StorageBackend::Json(JsonStore::open(&system.storage_url)?)),
        #[cfg(feature = "postgres")]
        BackendType::Postgres => Ok(StorageBackend::Postgres(PostgresStore::connect(system)?)),
        #[allow(unreachable_patterns)]
        other => Err(ExpenseError::UnsupportedBackend(other.to_string())),
    }
}

/// Fresh record identifier
pub(crate) fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Timestamps are kept to the microsecond, the PostgreSQL `TIMESTAMPTZ`
/// resolution, so both backends hand back the same value they store.
const TIMESTAMP_DIGITS: u16 = 6;

/// Validate an incoming expense and fill in the store-assigned fields
pub(crate) fn prepare_expense(expense: &Expense, default_currency: &str) -> ExpenseResult<Expense> {
    let mut prepared = expense.validated()?;
    prepared.date = prepared.date.map(|d| d.trunc_subsecs(TIMESTAMP_DIGITS));
    if prepared.id.is_empty() {
        prepared.id = new_id();
    }
    if prepared.currency.is_empty() {
        prepared.currency = default_currency.to_string();
    }
    Ok(prepared)
}

/// Validate an incoming template and fill in the store-assigned fields
pub(crate) fn prepare_recurring(
    template: &RecurringExpense,
    default_currency: &str,
) -> ExpenseResult<RecurringExpense> {
    let mut prepared = template.validated()?;
    prepared.start_date = prepared
        .start_date
        .map(|d| d.trunc_subsecs(TIMESTAMP_DIGITS));
    if prepared.id.is_empty() {
        prepared.id = new_id();
    }
    if prepared.currency.is_empty() {
        prepared.currency = default_currency.to_string();
    }
    Ok(prepared)
}

fn expense_order(a: &Expense, b: &Expense) -> Ordering {
    b.date.cmp(&a.date).then_with(|| a.id.cmp(&b.id))
}

fn recurring_order(a: &RecurringExpense, b: &RecurringExpense) -> Ordering {
    a.start_date
        .cmp(&b.start_date)
        .then_with(|| a.id.cmp(&b.id))
}

pub(crate) fn sort_expenses(expenses: &mut [Expense]) {
    expenses.sort_by(expense_order);
}

pub(crate) fn sort_recurring(templates: &mut [RecurringExpense]) {
    templates.sort_by(recurring_order);
}
