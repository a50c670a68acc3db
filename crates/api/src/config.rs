//! Application configuration loaded from environment variables.

use std::str::FromStr;

use domain::{OrderSettings, ParsePolicyError, TransitionPolicy};
use thiserror::Error;

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            _ => Err(ConfigError::LogFormat(s.to_string())),
        }
    }
}

/// Invalid configuration values.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("STATUS_TRANSITIONS: {0}")]
    TransitionPolicy(#[from] ParsePolicyError),

    #[error("LOG_FORMAT: invalid value '{0}'. Valid values: text, json")]
    LogFormat(String),
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST` — bind address (default: `"0.0.0.0"`)
/// - `PORT` — listen port (default: `3000`)
/// - `RUST_LOG` — tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT` — `text` or `json` (default: `text`)
/// - `DATABASE_URL` — PostgreSQL URL; unset selects the in-memory store
/// - `DATABASE_MAX_CONNECTIONS` — pool size (default: `5`)
/// - `STATUS_TRANSITIONS` — `permissive` or `strict` (default: `permissive`)
/// - `COMPENSATION_ATTEMPTS` — compensating delete attempts (default: `3`)
/// - `MAX_PAGE_SIZE` — upper bound of `limit` on listings (default: `100`)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub transitions: TransitionPolicy,
    pub compensation_attempts: u32,
    pub max_page_size: u32,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration from an arbitrary key lookup.
    ///
    /// Unparseable numbers fall back to their defaults; unknown enumerated
    /// values are errors.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let number = |key: &str, default: u32| {
            lookup(key)
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(default)
        };

        Ok(Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: lookup("LOG_FORMAT")
                .map(|v| v.parse::<LogFormat>())
                .transpose()?
                .unwrap_or_default(),
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            database_max_connections: number(
                "DATABASE_MAX_CONNECTIONS",
                defaults.database_max_connections,
            ),
            transitions: lookup("STATUS_TRANSITIONS")
                .map(|v| v.parse::<TransitionPolicy>())
                .transpose()?
                .unwrap_or_default(),
            compensation_attempts: number("COMPENSATION_ATTEMPTS", defaults.compensation_attempts),
            max_page_size: number("MAX_PAGE_SIZE", defaults.max_page_size),
        })
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Settings handed to the order service.
    pub fn order_settings(&self) -> OrderSettings {
        OrderSettings {
            transitions: self.transitions,
            compensation_attempts: self.compensation_attempts,
            max_page_size: self.max_page_size,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let orders = OrderSettings::default();
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            database_url: None,
            database_max_connections: 5,
            transitions: orders.transitions,
            compensation_attempts: orders.compensation_attempts,
            max_page_size: orders.max_page_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_default_values() {
        let config = Config::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.log_format, LogFormat::Text);
        assert!(config.database_url.is_none());
        assert_eq!(config.transitions, TransitionPolicy::Permissive);
        assert_eq!(config.compensation_attempts, 3);
        assert_eq!(config.max_page_size, 100);
    }

    #[test]
    fn test_addr_formatting() {
        let config = Config {
            host: "127.0.0.1".to_string(),
            port: 8080,
            ..Default::default()
        };
        assert_eq!(config.addr(), "127.0.0.1:8080");
    }

    #[test]
    fn test_empty_lookup_gives_defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.addr(), "0.0.0.0:3000");
        assert_eq!(config.database_max_connections, 5);
    }

    #[test]
    fn test_reads_all_variables() {
        let config = Config::from_lookup(lookup(&[
            ("HOST", "127.0.0.1"),
            ("PORT", "8080"),
            ("RUST_LOG", "debug"),
            ("LOG_FORMAT", "json"),
            ("DATABASE_URL", "postgres://localhost/orders"),
            ("DATABASE_MAX_CONNECTIONS", "20"),
            ("STATUS_TRANSITIONS", "permissive"),
            ("COMPENSATION_ATTEMPTS", "5"),
            ("MAX_PAGE_SIZE", "50"),
        ]))
        .unwrap();

        assert_eq!(config.addr(), "127.0.0.1:8080");
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(
            config.database_url.as_deref(),
            Some("postgres://localhost/orders")
        );
        assert_eq!(config.database_max_connections, 20);

        let settings = config.order_settings();
        assert_eq!(settings.transitions, TransitionPolicy::Permissive);
        assert_eq!(settings.compensation_attempts, 5);
        assert_eq!(settings.max_page_size, 50);
    }

    #[test]
    fn test_strict_transitions_are_opt_in() {
        let config = Config::from_lookup(lookup(&[("STATUS_TRANSITIONS", "strict")])).unwrap();
        assert_eq!(config.order_settings().transitions, TransitionPolicy::Strict);
    }

    #[test]
    fn test_bad_numbers_fall_back() {
        let config = Config::from_lookup(lookup(&[
            ("PORT", "http"),
            ("MAX_PAGE_SIZE", "lots"),
            ("DATABASE_URL", ""),
        ]))
        .unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.max_page_size, 100);
        assert!(config.database_url.is_none());
    }

    #[test]
    fn test_unknown_policy_is_an_error() {
        let err = Config::from_lookup(lookup(&[("STATUS_TRANSITIONS", "lenient")])).unwrap_err();
        assert!(matches!(err, ConfigError::TransitionPolicy(_)));

        let err = Config::from_lookup(lookup(&[("LOG_FORMAT", "xml")])).unwrap_err();
        assert!(matches!(err, ConfigError::LogFormat(_)));
    }
}
