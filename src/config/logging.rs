//! Tracing subscriber setup for the binary
//!
//! `RUST_LOG` takes precedence over the level passed in.

use tracing_subscriber::EnvFilter;

use crate::error::{ExpenseError, ExpenseResult};

/// Install the global tracing subscriber
///
/// Logs go to stderr so that command output on stdout stays machine-readable.
pub fn init_logging(level: &str, json: bool) -> ExpenseResult<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .map_err(|e| ExpenseError::Config(format!("Invalid log level '{}': {}", level, e)))?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let result = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    result.map_err(|e| ExpenseError::Config(format!("Failed to initialize logging: {}", e)))
}
