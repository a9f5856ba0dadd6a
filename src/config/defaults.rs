//! User-supplied defaults for a fresh store
//!
//! When a store is created without an existing configuration, its base
//! [`Config`] comes from an optional `user-defaults.json` merged over the
//! built-in defaults. A missing document is normal; a malformed one is an
//! error.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::paths::user_defaults_candidates;
use crate::error::{ExpenseError, ExpenseResult};
use crate::models::wire::nullable_list;
use crate::models::{Config, DEFAULT_CATEGORIES, DEFAULT_CURRENCY, DEFAULT_START_DATE};

/// Optional overrides read from `user-defaults.json`
///
/// Missing keys and explicit `null`s both mean "use the built-in value".
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDefaults {
    #[serde(default, deserialize_with = "nullable_list")]
    pub categories: Vec<String>,

    #[serde(default)]
    pub currency: Option<String>,

    #[serde(default)]
    pub start_date: Option<i64>,

    /// Used by the web frontend only
    #[serde(default)]
    pub theme: Option<String>,
}

impl UserDefaults {
    /// Merge these overrides over the built-in defaults
    pub fn into_config(self) -> Config {
        let categories = if self.categories.is_empty() {
            DEFAULT_CATEGORIES.iter().map(|c| c.to_string()).collect()
        } else {
            self.categories
        };

        let currency = self
            .currency
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| DEFAULT_CURRENCY.to_string());

        let start_date = match self.start_date.map(u32::try_from) {
            Some(Ok(day @ 1..=31)) => day,
            _ => DEFAULT_START_DATE,
        };

        Config {
            categories,
            currency,
            start_date,
            recurring_expenses: Vec::new(),
        }
    }
}

/// Load the first user defaults document found from `dir`
///
/// Returns `Ok(None)` when no candidate exists.
pub fn load_user_defaults_from(dir: &Path) -> ExpenseResult<Option<(PathBuf, UserDefaults)>> {
    let Some(path) = user_defaults_candidates(dir)
        .into_iter()
        .find(|candidate| candidate.is_file())
    else {
        return Ok(None);
    };

    let contents = std::fs::read_to_string(&path)
        .map_err(|e| ExpenseError::Io(format!("Failed to read {}: {}", path.display(), e)))?;

    let defaults = serde_json::from_str(&contents).map_err(|source| ExpenseError::DefaultsParse {
        path: path.clone(),
        source,
    })?;

    Ok(Some((path, defaults)))
}

/// Resolve the base config, probing relative to `dir`
pub fn resolve_base_config_from(dir: &Path) -> ExpenseResult<Config> {
    match load_user_defaults_from(dir)? {
        Some((path, defaults)) => {
            tracing::info!(path = %path.display(), "Applying user defaults");
            Ok(defaults.into_config())
        }
        None => {
            tracing::debug!("No user defaults found, using built-in defaults");
            Ok(Config::default())
        }
    }
}

/// Resolve the base config, probing relative to the working directory
pub fn resolve_base_config() -> ExpenseResult<Config> {
    resolve_base_config_from(Path::new("."))
}
