//! Backend settings read from the environment
//!
//! | Variable | Values | Default |
//! |----------|--------|---------|
//! | `STORAGE_TYPE` | `json`, `postgres` | `json` |
//! | `STORAGE_URL` | directory or connection target | `data` |
//! | `STORAGE_SSL` | `disable`, `require`, `verify-full`, `verify-ca` | `disable` |
//! | `STORAGE_USER` | database user | empty |
//! | `STORAGE_PASS` | database password | empty |
//!
//! Unknown values fall back to the defaults; nothing here fails.

use std::fmt;

use serde::Serialize;

pub const STORAGE_TYPE_ENV: &str = "STORAGE_TYPE";
pub const STORAGE_URL_ENV: &str = "STORAGE_URL";
pub const STORAGE_SSL_ENV: &str = "STORAGE_SSL";
pub const STORAGE_USER_ENV: &str = "STORAGE_USER";
pub const STORAGE_PASS_ENV: &str = "STORAGE_PASS";

/// Storage location used when `STORAGE_URL` is unset
pub const DEFAULT_STORAGE_URL: &str = "data";

/// Which store implementation to construct
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendType {
    /// JSON documents on the local filesystem
    #[default]
    Json,
    /// PostgreSQL database
    Postgres,
}

impl BackendType {
    /// Map a raw setting, defaulting to JSON
    pub fn from_setting(raw: &str) -> Self {
        match raw {
            "postgres" => Self::Postgres,
            _ => Self::Json,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Postgres => "postgres",
        }
    }
}

impl fmt::Display for BackendType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// TLS mode for the database connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SslMode {
    #[default]
    Disable,
    Require,
    VerifyFull,
    VerifyCa,
}

impl SslMode {
    /// Map a raw setting, defaulting to `disable`
    pub fn from_setting(raw: &str) -> Self {
        match raw {
            "require" => Self::Require,
            "verify-full" => Self::VerifyFull,
            "verify-ca" => Self::VerifyCa,
            _ => Self::Disable,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disable => "disable",
            Self::Require => "require",
            Self::VerifyFull => "verify-full",
            Self::VerifyCa => "verify-ca",
        }
    }
}

impl fmt::Display for SslMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bootstrap settings for constructing a store; never persisted
#[derive(Clone, PartialEq, Eq, Default)]
pub struct SystemConfig {
    pub storage_type: BackendType,
    pub storage_url: String,
    pub storage_user: String,
    pub storage_pass: String,
    pub storage_ssl: SslMode,
}

impl SystemConfig {
    /// Resolve settings from the process environment
    pub fn from_env() -> Self {
        resolve_system_config(|key| std::env::var(key).ok())
    }
}

// The password never reaches logs.
impl fmt::Debug for SystemConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SystemConfig")
            .field("storage_type", &self.storage_type)
            .field("storage_url", &self.storage_url)
            .field("storage_user", &self.storage_user)
            .field(
                "storage_pass",
                &if self.storage_pass.is_empty() { "" } else { "***" },
            )
            .field("storage_ssl", &self.storage_ssl)
            .finish()
    }
}

/// Resolve backend settings through an arbitrary key lookup
pub fn resolve_system_config<F>(lookup: F) -> SystemConfig
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).unwrap_or_default();

    let storage_url = match get(STORAGE_URL_ENV) {
        url if url.is_empty() => DEFAULT_STORAGE_URL.to_string(),
        url => url,
    };

    SystemConfig {
        storage_type: BackendType::from_setting(&get(STORAGE_TYPE_ENV)),
        storage_url,
        storage_user: get(STORAGE_USER_ENV),
        storage_pass: get(STORAGE_PASS_ENV),
        storage_ssl: SslMode::from_setting(&get(STORAGE_SSL_ENV)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_empty_environment_defaults() {
        let config = resolve_system_config(|_| None);
        assert_eq!(
            config,
            SystemConfig {
                storage_type: BackendType::Json,
                storage_url: "data".into(),
                storage_user: String::new(),
                storage_pass: String::new(),
                storage_ssl: SslMode::Disable,
            }
        );
    }

    #[test]
    fn test_backend_type_mapping() {
        assert_eq!(BackendType::from_setting("json"), BackendType::Json);
        assert_eq!(BackendType::from_setting("postgres"), BackendType::Postgres);
        assert_eq!(BackendType::from_setting("Postgres"), BackendType::Json);
        assert_eq!(BackendType::from_setting("sqlite"), BackendType::Json);
        assert_eq!(BackendType::from_setting(""), BackendType::Json);
    }

    #[test]
    fn test_ssl_mode_mapping() {
        for mode in ["disable", "require", "verify-full", "verify-ca"] {
            assert_eq!(SslMode::from_setting(mode).as_str(), mode);
        }
        assert_eq!(SslMode::from_setting("prefer"), SslMode::Disable);
        assert_eq!(SslMode::from_setting(""), SslMode::Disable);
    }

    #[test]
    fn test_full_environment_passthrough() {
        let config = resolve_system_config(lookup_from(&[
            ("STORAGE_TYPE", "postgres"),
            ("STORAGE_URL", "db.local:5432/expenses"),
            ("STORAGE_SSL", "verify-ca"),
            ("STORAGE_USER", "owl"),
            ("STORAGE_PASS", "  s3cret "),
        ]));

        assert_eq!(config.storage_type, BackendType::Postgres);
        assert_eq!(config.storage_url, "db.local:5432/expenses");
        assert_eq!(config.storage_ssl, SslMode::VerifyCa);
        assert_eq!(config.storage_user, "owl");
        assert_eq!(config.storage_pass, "  s3cret ");
    }

    #[test]
    fn test_empty_url_uses_default() {
        let config = resolve_system_config(lookup_from(&[("STORAGE_URL", "")]));
        assert_eq!(config.storage_url, DEFAULT_STORAGE_URL);
    }

    #[test]
    fn test_debug_redacts_password() {
        let config = resolve_system_config(lookup_from(&[("STORAGE_PASS", "hunter2")]));
        let debug = format!("{:?}", config);
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("***"));
    }
}
