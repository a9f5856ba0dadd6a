//! Core data models for expense-store
//!
//! Configuration, one-off expenses and recurring expense templates, with the
//! wire names the stores read and write.

pub mod config;
pub mod expense;
pub mod recurring;
pub mod wire;

pub use config::{
    is_supported_currency, Config, DEFAULT_CATEGORIES, DEFAULT_CURRENCY, DEFAULT_START_DATE,
    SUPPORTED_CURRENCIES,
};
pub use expense::Expense;
pub use recurring::{Interval, RecurringExpense, UNBOUNDED_OCCURRENCES};
