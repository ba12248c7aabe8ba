//! Application configuration loaded from environment variables.

use std::time::Duration;

use crm_sync::HttpCrmConfig;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST` — bind address (default: `"0.0.0.0"`)
/// - `PORT` — listen port (default: `3000`)
/// - `RUST_LOG` — tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT` — `text` or `json` (default: `text`)
/// - `DATABASE_URL` — PostgreSQL URL; the in-memory store is used when unset
/// - `DATABASE_MAX_CONNECTIONS` — pool size (default: `5`)
/// - `CRM_BASE_URL` — CRM API root; the in-memory CRM is used when unset
/// - `CRM_API_KEY` — bearer token for the CRM
/// - `CRM_TIMEOUT_SECS` — per-request CRM timeout (default: `10`)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub crm_base_url: Option<String>,
    pub crm_api_key: Option<String>,
    pub crm_timeout: Duration,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            host: non_empty("HOST").unwrap_or(defaults.host),
            port: non_empty("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            log_level: non_empty("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: match non_empty("LOG_FORMAT").as_deref() {
                Some(f) if f.eq_ignore_ascii_case("json") => LogFormat::Json,
                _ => defaults.log_format,
            },
            database_url: non_empty("DATABASE_URL"),
            database_max_connections: non_empty("DATABASE_MAX_CONNECTIONS")
                .and_then(|n| n.parse().ok())
                .unwrap_or(defaults.database_max_connections),
            crm_base_url: non_empty("CRM_BASE_URL"),
            crm_api_key: non_empty("CRM_API_KEY"),
            crm_timeout: non_empty("CRM_TIMEOUT_SECS")
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.crm_timeout),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Returns the HTTP CRM settings, if a CRM endpoint is configured.
    pub fn crm_config(&self) -> Option<HttpCrmConfig> {
        let base_url = self.crm_base_url.as_ref()?;
        let mut config = HttpCrmConfig::new(base_url.clone()).with_timeout(self.crm_timeout);
        if let Some(api_key) = &self.crm_api_key {
            config = config.with_api_key(api_key.clone());
        }
        Some(config)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            database_url: None,
            database_max_connections: 5,
            crm_base_url: None,
            crm_api_key: None,
            crm_timeout: Duration::from_secs(10),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn from_pairs(pairs: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_default_values() {
        let config = from_pairs(&[]);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.log_format, LogFormat::Text);
        assert!(config.database_url.is_none());
        assert_eq!(config.database_max_connections, 5);
        assert!(config.crm_config().is_none());
    }

    #[test]
    fn test_overrides() {
        let config = from_pairs(&[
            ("HOST", "127.0.0.1"),
            ("PORT", "8080"),
            ("LOG_FORMAT", "JSON"),
            ("DATABASE_URL", "postgres://localhost/props"),
            ("DATABASE_MAX_CONNECTIONS", "20"),
            ("CRM_BASE_URL", "https://crm.example.com/v1"),
            ("CRM_API_KEY", "secret"),
            ("CRM_TIMEOUT_SECS", "3"),
        ]);

        assert_eq!(config.addr(), "127.0.0.1:8080");
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(
            config.database_url.as_deref(),
            Some("postgres://localhost/props")
        );
        assert_eq!(config.database_max_connections, 20);

        let crm = config.crm_config().unwrap();
        assert_eq!(crm.base_url, "https://crm.example.com/v1");
        assert_eq!(crm.api_key.as_deref(), Some("secret"));
        assert_eq!(crm.timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_invalid_numbers_fall_back_to_defaults() {
        let config = from_pairs(&[("PORT", "http"), ("CRM_TIMEOUT_SECS", "soon")]);
        assert_eq!(config.port, 3000);
        assert_eq!(config.crm_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_blank_values_are_ignored() {
        let config = from_pairs(&[("DATABASE_URL", "  "), ("CRM_BASE_URL", "")]);
        assert!(config.database_url.is_none());
        assert!(config.crm_base_url.is_none());
    }
}
