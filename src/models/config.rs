//! Application configuration record and its built-in defaults

use serde::{Deserialize, Serialize};

use super::recurring::RecurringExpense;

/// Categories used when no user defaults override them
pub const DEFAULT_CATEGORIES: [&str; 10] = [
    "Food",
    "Groceries",
    "Travel",
    "Rent",
    "Utilities",
    "Entertainment",
    "Healthcare",
    "Shopping",
    "Miscellaneous",
    "Income",
];

/// Currency used when no user defaults override it
pub const DEFAULT_CURRENCY: &str = "usd";

/// Start-of-cycle day used when no valid override exists
pub const DEFAULT_START_DATE: u32 = 1;

/// Currency codes the application knows how to display
pub const SUPPORTED_CURRENCIES: [&str; 30] = [
    "usd", // US Dollar
    "eur", // Euro
    "gbp", // British Pound
    "jpy", // Japanese Yen
    "cny", // Chinese Yuan
    "krw", // Korean Won
    "inr", // Indian Rupee
    "rub", // Russian Ruble
    "brl", // Brazilian Real
    "zar", // South African Rand
    "aed", // UAE Dirham
    "aud", // Australian Dollar
    "cad", // Canadian Dollar
    "chf", // Swiss Franc
    "hkd", // Hong Kong Dollar
    "bdt", // Bangladeshi Taka
    "sgd", // Singapore Dollar
    "thb", // Thai Baht
    "try", // Turkish Lira
    "mxn", // Mexican Peso
    "php", // Philippine Peso
    "pln", // Polish Zloty
    "sek", // Swedish Krona
    "nzd", // New Zealand Dollar
    "dkk", // Danish Krone
    "idr", // Indonesian Rupiah
    "ils", // Israeli New Shekel
    "vnd", // Vietnamese Dong
    "myr", // Malaysian Ringgit
    "mad", // Moroccan Dirham
];

/// Check whether a currency code is in [`SUPPORTED_CURRENCIES`]
pub fn is_supported_currency(code: &str) -> bool {
    SUPPORTED_CURRENCIES.contains(&code)
}

/// Process-wide expense configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Ordered category names
    #[serde(default)]
    pub categories: Vec<String>,

    /// Default currency code
    #[serde(default)]
    pub currency: String,

    /// Day of month the spending cycle starts on
    #[serde(default = "default_start_date")]
    pub start_date: u32,

    /// Recurring expense templates
    #[serde(default)]
    pub recurring_expenses: Vec<RecurringExpense>,
}

fn default_start_date() -> u32 {
    DEFAULT_START_DATE
}

impl Default for Config {
    fn default() -> Self {
        Self {
            categories: DEFAULT_CATEGORIES.iter().map(|c| c.to_string()).collect(),
            currency: DEFAULT_CURRENCY.to_string(),
            start_date: DEFAULT_START_DATE,
            recurring_expenses: Vec::new(),
        }
    }
}
