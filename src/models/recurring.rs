//! Recurring expense templates
//!
//! A template describes a repeating transaction. Expenses generated from a
//! template point back at it through `recurring_id`; this module knows which
//! of those children an edit or removal reaches.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::expense::Expense;
use super::wire::{nullable_list, optional_timestamp};
use crate::error::{ExpenseError, ExpenseResult};
use crate::validation;

/// Occurrence count standing in for "unbounded" (`occurrences == 0`)
pub const UNBOUNDED_OCCURRENCES: u32 = 3000;

/// How often a recurring expense repeats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interval {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Interval {
    /// All intervals in ascending length
    pub fn all() -> &'static [Self] {
        &[Self::Daily, Self::Weekly, Self::Monthly, Self::Yearly]
    }

    /// The wire token for this interval
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Interval {
    type Err = ExpenseError;

    /// Tokens are case-sensitive: `"Daily"` is rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|interval| interval.as_str() == s)
            .ok_or_else(|| ExpenseError::InvalidInterval(s.to_string()))
    }
}

/// A template describing a repeating transaction
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurringExpense {
    /// Unique identifier (assigned by the store when empty)
    #[serde(default)]
    pub id: String,

    /// Display name
    #[serde(default)]
    pub name: String,

    /// Signed amount of each occurrence
    #[serde(default)]
    pub amount: f64,

    /// Currency code (inherits the configured currency when empty)
    #[serde(default)]
    pub currency: String,

    /// Free-text tags
    #[serde(default, deserialize_with = "nullable_list")]
    pub tags: Vec<String>,

    /// Category name
    #[serde(default)]
    pub category: String,

    /// Date of the first occurrence
    #[serde(default, deserialize_with = "optional_timestamp")]
    pub start_date: Option<DateTime<Utc>>,

    /// Raw interval token, see [`Interval`]
    #[serde(default)]
    pub interval: String,

    /// Number of occurrences; 0 means unbounded
    #[serde(default)]
    pub occurrences: u32,
}

impl RecurringExpense {
    /// Create a new template with an unassigned id
    pub fn new(
        name: impl Into<String>,
        category: impl Into<String>,
        amount: f64,
        start_date: DateTime<Utc>,
        interval: Interval,
        occurrences: u32,
    ) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
            amount,
            start_date: Some(start_date),
            interval: interval.as_str().to_string(),
            occurrences,
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

    /// The parsed interval
    pub fn interval(&self) -> ExpenseResult<Interval> {
        self.interval.parse()
    }

    /// Whether the template runs without an explicit end
    pub fn is_unbounded(&self) -> bool {
        self.occurrences == 0
    }

    /// Occurrence count with the unbounded sentinel resolved
    pub fn effective_occurrences(&self) -> u32 {
        if self.is_unbounded() {
            UNBOUNDED_OCCURRENCES
        } else {
            self.occurrences
        }
    }

    /// Return a sanitized, validated copy of this template
    pub fn validated(&self) -> ExpenseResult<Self> {
        validation::validate_recurring_expense(self)
    }

    /// Whether `expense` was generated from this template
    pub fn is_parent_of(&self, expense: &Expense) -> bool {
        !self.id.is_empty() && expense.recurring_id == self.id
    }

    /// Whether a series-wide edit or removal reaches `expense`
    ///
    /// With `whole_series` every child is reached; otherwise only children
    /// dated after `now`, so past occurrences stay as history.
    pub fn reaches(&self, expense: &Expense, whole_series: bool, now: DateTime<Utc>) -> bool {
        self.is_parent_of(expense)
            && (whole_series || expense.date.is_some_and(|date| date > now))
    }

    /// Copy the template's descriptive fields onto a child expense
    ///
    /// Dates are left alone.
    pub fn apply_to(&self, expense: &mut Expense) {
        expense.name = self.name.clone();
        expense.amount = self.amount;
        expense.currency = self.currency.clone();
        expense.tags = self.tags.clone();
        expense.category = self.category.clone();
    }
}

impl fmt::Display for RecurringExpense {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:.2} {} ({})", self.name, self.amount, self.currency, self.interval)
    }
}
