//! Path management for the JSON document store
//!
//! The store keeps two documents in its data directory:
//!
//! - `config.json`: categories, currency, start day and recurring templates
//! - `expenses.json`: every expense record

use std::path::{Path, PathBuf};

use crate::error::ExpenseError;

/// Name of the optional user defaults document
pub const USER_DEFAULTS_FILE: &str = "user-defaults.json";

/// How many parent directories are probed for the user defaults document
const USER_DEFAULTS_PARENT_DEPTH: usize = 2;

/// Manages all paths used by the JSON store
#[derive(Debug, Clone)]
pub struct DataPaths {
    /// Directory holding the store documents
    data_dir: PathBuf,
}

impl DataPaths {
    /// Create paths rooted at `data_dir`
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Get the data directory
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Get the path to config.json
    pub fn config_file(&self) -> PathBuf {
        self.data_dir.join("config.json")
    }

    /// Get the path to expenses.json
    pub fn expenses_file(&self) -> PathBuf {
        self.data_dir.join("expenses.json")
    }

    /// Ensure the data directory exists
    pub fn ensure_directories(&self) -> Result<(), ExpenseError> {
        std::fs::create_dir_all(&self.data_dir)
            .map_err(|e| ExpenseError::Io(format!("Failed to create data directory: {}", e)))
    }

    /// Check if the store has been initialized (config file exists)
    pub fn is_initialized(&self) -> bool {
        self.config_file().exists()
    }
}

/// Candidate locations for the user defaults document, in probe order
///
/// `dir/user-defaults.json`, then one and two levels up.
pub fn user_defaults_candidates(dir: &Path) -> Vec<PathBuf> {
    let mut candidates = Vec::with_capacity(USER_DEFAULTS_PARENT_DEPTH + 1);
    let mut base = dir.to_path_buf();
    for _ in 0..=USER_DEFAULTS_PARENT_DEPTH {
        candidates.push(base.join(USER_DEFAULTS_FILE));
        base = base.join("..");
    }
    candidates
}
