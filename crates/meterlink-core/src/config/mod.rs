//! Datasource configuration with layered loading.
//!
//! Configuration is loaded in this order (later overrides earlier):
//!
//! 1. **Compiled defaults**: hardcoded in struct `Default` implementations
//! 2. **Config file**: TOML file specified by `METERLINK_CONFIG` env var
//! 3. **Environment variables**: `METERLINK__*` overrides with `__` as the
//!    nesting separator (e.g. `METERLINK__PROMETHEUS__URL=...`)
//!
//! Base URLs are normalized (trailing slash stripped) before the clients
//! use them, so `http://host:9090/` and `http://host:9090` are equivalent.

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::prometheus::ApiVersion;

/// Metrics backend (Prometheus-style) connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrometheusConfig {
    /// Base URL of the metrics API.
    pub url: String,

    /// Protocol dialect spoken by the backend. Defaults to [`ApiVersion::V1`].
    #[serde(default)]
    pub api_version: ApiVersion,
}

/// Monitoring backend (Zabbix-style) connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZabbixConfig {
    /// JSON-RPC endpoint URL.
    pub url: String,

    /// Login name used for `user.login`.
    pub username: String,

    /// Password used for `user.login`.
    pub password: String,
}

/// Library logging configuration, consumed by embedding hosts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (e.g. "trace", "debug", "info"). Defaults to `"info"`.
    pub level: String,
}

/// Root configuration for a pair of datasource backends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Metrics backend settings, when a metrics datasource is configured.
    #[serde(default)]
    pub prometheus: Option<PrometheusConfig>,

    /// Monitoring backend settings, when a monitoring datasource is
    /// configured.
    #[serde(default)]
    pub zabbix: Option<ZabbixConfig>,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string() }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self { prometheus: None, zabbix: None, logging: LoggingConfig::default() }
    }
}

/// Strips any trailing slashes from a base URL.
#[must_use]
pub fn normalize_base_url(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

impl AppConfig {
    /// Loads configuration from a TOML file with environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read, parsed, or
    /// deserialized.
    pub fn from_file<P: AsRef<Path>>(config_path: P) -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .set_default("logging.level", "info")?
            .add_source(File::with_name(&config_path.as_ref().to_string_lossy()).required(false))
            .add_source(Environment::with_prefix("METERLINK").separator("__"))
            .build()?;

        builder.try_deserialize()
    }

    /// Loads configuration from `config/config.toml`, overridable via the
    /// `METERLINK_CONFIG` env var.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the configuration cannot be loaded.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path =
            std::env::var("METERLINK_CONFIG").unwrap_or_else(|_| "config/config.toml".to_string());
        Self::from_file(&config_path)
    }

    /// Validates the configuration for correctness.
    ///
    /// At least one backend must be configured, and every configured URL
    /// must be an http(s) endpoint.
    ///
    /// # Errors
    ///
    /// Returns a descriptive error string if validation fails.
    pub fn validate(&self) -> Result<(), String> {
        if self.prometheus.is_none() && self.zabbix.is_none() {
            return Err("No datasource backends configured".to_string());
        }

        if let Some(ref prometheus) = self.prometheus {
            if !prometheus.url.starts_with("http") {
                return Err(format!("Invalid metrics backend URL: {}", prometheus.url));
            }
        }

        if let Some(ref zabbix) = self.zabbix {
            if !zabbix.url.starts_with("http") {
                return Err(format!("Invalid monitoring backend URL: {}", zabbix.url));
            }
            if zabbix.username.is_empty() {
                return Err("Monitoring backend username is empty".to_string());
            }
        }

        Ok(())
    }
}
