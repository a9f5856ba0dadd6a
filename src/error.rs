//! Error types for expense-store
//!
//! A single error enum covers validation, lookup, configuration and backend
//! failures. Validation variants are ordinary values: callers report them as
//! rejected writes and carry on.

use std::path::PathBuf;

use thiserror::Error;

/// The main error type for expense-store operations
#[derive(Error, Debug)]
pub enum ExpenseError {
    /// A required text field is empty after sanitization
    #[error("'{0}' cannot be empty or contain only invalid characters")]
    EmptyField(&'static str),

    /// Expense amount is exactly zero
    #[error("amount cannot be 0")]
    InvalidAmount,

    /// Expense has no date
    #[error("expense date must be specified")]
    MissingDate,

    /// Recurring expense has no start date
    #[error("start date for recurring expense must be specified")]
    MissingStartDate,

    /// Recurring expense would not actually recur
    #[error("at least 2 occurrences required to recur")]
    TooFewOccurrences,

    /// Interval is not one of the recognised tokens
    #[error("invalid interval: '{0}'. Must be one of 'daily', 'weekly', 'monthly', or 'yearly'")]
    InvalidInterval(String),

    /// Start-of-cycle day outside 1..=31
    #[error("invalid start date: {0} (must be between 1 and 31)")]
    InvalidStartDate(i64),

    /// Entity not found errors
    #[error("{entity_type} not found: {identifier}")]
    NotFound {
        entity_type: &'static str,
        identifier: String,
    },

    /// Duplicate entity errors
    #[error("{entity_type} already exists: {identifier}")]
    Duplicate {
        entity_type: &'static str,
        identifier: String,
    },

    /// No constructor exists for the selected backend
    #[error("invalid data store: {0}")]
    UnsupportedBackend(String),

    /// The user defaults document exists but is malformed
    #[error("failed to parse {}", path.display())]
    DefaultsParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(String),

    /// Backend errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Import errors
    #[error("Import error: {0}")]
    Import(String),

    /// Export errors
    #[error("Export error: {0}")]
    Export(String),
}

impl ExpenseError {
    /// Create a "not found" error for expenses
    pub fn expense_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Expense",
            identifier: identifier.into(),
        }
    }

    /// Create a "not found" error for recurring expenses
    pub fn recurring_expense_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Recurring expense",
            identifier: identifier.into(),
        }
    }

    /// Create a "duplicate" error for expenses
    pub fn duplicate_expense(identifier: impl Into<String>) -> Self {
        Self::Duplicate {
            entity_type: "Expense",
            identifier: identifier.into(),
        }
    }

    /// Create a "duplicate" error for recurring expenses
    pub fn duplicate_recurring_expense(identifier: impl Into<String>) -> Self {
        Self::Duplicate {
            entity_type: "Recurring expense",
            identifier: identifier.into(),
        }
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this is a validation error
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::EmptyField(_)
                | Self::InvalidAmount
                | Self::MissingDate
                | Self::MissingStartDate
                | Self::TooFewOccurrences
                | Self::InvalidInterval(_)
                | Self::InvalidStartDate(_)
        )
    }
}

impl From<std::io::Error> for ExpenseError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for ExpenseError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

impl From<csv::Error> for ExpenseError {
    fn from(err: csv::Error) -> Self {
        Self::Import(err.to_string())
    }
}

#[cfg(feature = "postgres")]
impl From<postgres::Error> for ExpenseError {
    fn from(err: postgres::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

/// Result type alias for expense-store operations
pub type ExpenseResult<T> = Result<T, ExpenseError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_error_display() {
        let err = ExpenseError::EmptyField("name");
        assert_eq!(
            err.to_string(),
            "'name' cannot be empty or contain only invalid characters"
        );
    }

    #[test]
    fn test_not_found_error() {
        let err = ExpenseError::expense_not_found("abc");
        assert_eq!(err.to_string(), "Expense not found: abc");
        assert!(err.is_not_found());
        assert!(!err.is_validation());
    }

    #[test]
    fn test_validation_classification() {
        assert!(ExpenseError::InvalidAmount.is_validation());
        assert!(ExpenseError::InvalidInterval("Daily".into()).is_validation());
        assert!(!ExpenseError::UnsupportedBackend("mongo".into()).is_validation());
    }

    #[test]
    fn test_defaults_parse_keeps_cause() {
        let cause = serde_json::from_str::<serde_json::Value>("{oops").unwrap_err();
        let err = ExpenseError::DefaultsParse {
            path: PathBuf::from("user-defaults.json"),
            source: cause,
        };
        assert_eq!(err.to_string(), "failed to parse user-defaults.json");
        assert!(err.source().is_some());
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: ExpenseError = io_err.into();
        assert!(matches!(err, ExpenseError::Io(_)));
    }
}
