//! Configuration module for expense-store
//!
//! This module provides:
//! - Backend selection from `STORAGE_*` environment settings
//! - Base configuration from an optional `user-defaults.json`
//! - Data directory layout for the JSON store
//! - Logging setup

pub mod defaults;
pub mod logging;
pub mod paths;
pub mod system;

pub use defaults::{resolve_base_config, resolve_base_config_from, UserDefaults};
pub use paths::DataPaths;
pub use system::{resolve_system_config, BackendType, SslMode, SystemConfig};
