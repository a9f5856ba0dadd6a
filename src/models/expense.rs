//! Expense model
//!
//! A single financial transaction. Positive amounts are spending, negative
//! amounts are refunds or income; zero is never valid.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::wire::{nullable_list, optional_timestamp};
use crate::error::ExpenseResult;
use crate::validation;

/// A single expense record
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    /// Unique identifier (assigned by the store when empty)
    #[serde(default)]
    pub id: String,

    /// Originating recurring expense, empty if none
    #[serde(rename = "recurringID", default)]
    pub recurring_id: String,

    /// Display name
    #[serde(default)]
    pub name: String,

    /// Free-text tags
    #[serde(default, deserialize_with = "nullable_list")]
    pub tags: Vec<String>,

    /// Category name
    #[serde(default)]
    pub category: String,

    /// Signed amount
    #[serde(default)]
    pub amount: f64,

    /// Currency code (inherits the configured currency when empty)
    #[serde(default)]
    pub currency: String,

    /// When the expense happened
    #[serde(default, deserialize_with = "optional_timestamp")]
    pub date: Option<DateTime<Utc>>,
}

impl Expense {
    /// Create a new expense with an unassigned id
    pub fn new(
        name: impl Into<String>,
        category: impl Into<String>,
        amount: f64,
        date: DateTime<Utc>,
    ) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
            amount,
            date: Some(date),
            ..Self::default()
        }
    }

    /// Builder-style tag assignment
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Builder-style currency assignment
    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }

    /// Whether this expense was generated from a recurring template
    pub fn is_recurring(&self) -> bool {
        !self.recurring_id.is_empty()
    }

    /// Return a sanitized, validated copy of this expense
    pub fn validated(&self) -> ExpenseResult<Self> {
        validation::validate_expense(self)
    }
}

impl fmt::Display for Expense {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.date {
            Some(date) => write!(
                f,
                "{} {} {:.2} {}",
                date.format("%Y-%m-%d"),
                self.name,
                self.amount,
                self.currency
            ),
            None => write!(f, "{} {:.2} {}", self.name, self.amount, self.currency),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn jan_15() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 15, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_new_expense() {
        let expense = Expense::new("Coffee", "Food", 4.5, jan_15());
        assert!(expense.id.is_empty());
        assert!(!expense.is_recurring());
        assert_eq!(expense.date, Some(jan_15()));
    }

    #[test]
    fn test_wire_names() {
        let mut expense = Expense::new("Rent", "Rent", 1200.0, jan_15()).with_currency("eur");
        expense.recurring_id = "r1".into();

        let json = serde_json::to_value(&expense).unwrap();
        assert_eq!(json["recurringID"], "r1");
        assert_eq!(json["currency"], "eur");
        assert!(json.get("recurring_id").is_none());
    }

    #[test]
    fn test_reads_null_tags() {
        let json = r#"{"id":"1","recurringID":"","name":"Tea","tags":null,
            "category":"Food","amount":3,"currency":"usd","date":"2025-01-15T00:00:00Z"}"#;
        let expense: Expense = serde_json::from_str(json).unwrap();
        assert!(expense.tags.is_empty());
        assert_eq!(expense.date, Some(jan_15()));
    }

    #[test]
    fn test_display() {
        let expense = Expense::new("Coffee", "Food", 4.5, jan_15()).with_currency("usd");
        assert_eq!(format!("{}", expense), "2025-01-15 Coffee 4.50 usd");
    }
}
