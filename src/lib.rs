//! expense-store - persistence layer for a personal expense tracker
//!
//! Stores expenses, recurring expense templates and a small configuration
//! record behind one [`storage::Storage`] capability, backed either by JSON
//! documents on disk or by PostgreSQL.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - `config`: Backend selection, user defaults, paths and logging setup
//! - `error`: Custom error types
//! - `models`: Expense, recurring expense and configuration records
//! - `validation`: Text sanitization and record validation
//! - `storage`: The storage capability and its backends
//! - `export`: CSV exchange and JSON backups
//! - `cli`: Command handlers for the `expensectl` binary
//!
//! # Example
//!
//! ```rust,ignore
//! use expense_store::storage::{initialize_storage, Storage};
//!
//! let storage = initialize_storage()?;
//! for expense in storage.get_all_expenses()? {
//!     println!("{}", expense);
//! }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod models;
pub mod storage;
pub mod validation;

pub use error::{ExpenseError, ExpenseResult};
pub use models::{Config, Expense, Interval, RecurringExpense};
pub use storage::{initialize_storage, Storage, StorageBackend};
