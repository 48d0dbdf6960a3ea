//! Configuration management for the aclgate server.
//!
//! This module provides configuration loading with multiple sources:
//! 1. Default values (hardcoded)
//! 2. Configuration file (YAML)
//! 3. Environment variables (override)
//!
//! # Configuration Hierarchy
//!
//! Environment variables take precedence over config file values,
//! which take precedence over defaults.
//!
//! # Example
//!
//! ```ignore
//! use aclgate_server::config::ServerConfig;
//!
//! // Load from file with env overrides
//! let config = ServerConfig::load("aclgate.yaml")?;
//!
//! // Or load from environment only
//! let config = ServerConfig::from_env()?;
//! ```

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use aclgate_domain::token::TokenSettings;
use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

/// Prefix of environment variable overrides, e.g. `ACLGATE_SERVER__PORT`.
const ENV_PREFIX: &str = "ACLGATE";

/// Server configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct ServerConfig {
    /// HTTP listener settings
    #[serde(default)]
    pub server: ServerSettings,

    /// Relationship store settings
    #[serde(default)]
    pub store: StoreSettings,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingSettings,

    /// Metrics settings
    #[serde(default)]
    pub metrics: MetricsSettings,

    /// Token assembly settings
    #[serde(default)]
    pub token: TokenConfig,
}

/// Server network settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ServerSettings {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Maximum request body size; configuration documents can be large.
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
            body_limit_bytes: default_body_limit(),
        }
    }
}

impl ServerSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_request_timeout() -> u64 {
    30
}

fn default_body_limit() -> usize {
    16 * 1024 * 1024
}

/// Relationship store settings.
///
/// ```yaml
/// store:
///   backend: spicedb
///   endpoint: http://localhost:8443
///   preshared_key: somerandomkeyhere
///   timeout_secs: 10
///   fully_consistent: false
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct StoreSettings {
    /// Store backend: "memory" or "spicedb"
    #[serde(default = "default_store_backend")]
    pub backend: String,

    /// HTTP gateway URL (required if backend is "spicedb")
    pub endpoint: Option<String>,

    /// Preshared key sent as bearer token
    pub preshared_key: Option<String>,

    /// Per-request timeout in seconds
    #[serde(default = "default_store_timeout")]
    pub timeout_secs: u64,

    /// Read at full consistency instead of minimizing latency
    #[serde(default)]
    pub fully_consistent: bool,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            backend: default_store_backend(),
            endpoint: None,
            preshared_key: None,
            timeout_secs: default_store_timeout(),
            fully_consistent: false,
        }
    }
}

impl StoreSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_store_backend() -> String {
    "memory".to_string()
}

fn default_store_timeout() -> u64 {
    10
}

/// Logging settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct LoggingSettings {
    /// Log level: "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Use JSON format (true for production, false for development)
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Metrics settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct MetricsSettings {
    /// Enable metrics endpoint
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Metrics endpoint path
    #[serde(default = "default_metrics_path")]
    pub path: String,
}

impl Default for MetricsSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            path: default_metrics_path(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

/// Token assembly settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct TokenConfig {
    /// Subject type of SSO users
    #[serde(default = "default_subject_type")]
    pub subject_type: String,

    /// Partner display names keyed by partner id
    #[serde(default)]
    pub partner_names: HashMap<String, String>,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            subject_type: default_subject_type(),
            partner_names: HashMap::new(),
        }
    }
}

impl TokenConfig {
    /// Token settings with the configured subject type.
    pub fn settings(&self) -> TokenSettings {
        TokenSettings {
            subject_type: self.subject_type.clone(),
            ..TokenSettings::default()
        }
    }
}

fn default_subject_type() -> String {
    TokenSettings::default().subject_type
}

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] ConfigError),

    #[error("configuration file not found: {path}")]
    FileNotFound { path: String },

    #[error("invalid configuration: {message}")]
    Invalid { message: String },
}

impl ServerConfig {
    /// Load configuration from a YAML file with environment variable overrides.
    ///
    /// Environment variables are prefixed with `ACLGATE_` and use `__` as separator:
    /// - `ACLGATE_SERVER__PORT=9090` overrides `server.port`
    /// - `ACLGATE_STORE__ENDPOINT=...` overrides `store.endpoint`
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigLoadError::FileNotFound {
                path: path.display().to_string(),
            });
        }

        let config = Config::builder()
            .add_source(Config::try_from(&ServerConfig::default())?)
            .add_source(File::from(path).format(FileFormat::Yaml))
            .add_source(environment())
            .build()?;

        let server_config: ServerConfig = config.try_deserialize()?;
        server_config.validate()?;
        Ok(server_config)
    }

    /// Load configuration from defaults and environment variables only.
    pub fn from_env() -> Result<Self, ConfigLoadError> {
        let config = Config::builder()
            .add_source(Config::try_from(&ServerConfig::default())?)
            .add_source(environment())
            .build()?;

        let server_config: ServerConfig = config.try_deserialize()?;
        server_config.validate()?;
        Ok(server_config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        if self.server.port == 0 {
            return Err(invalid("server.port must be greater than 0"));
        }
        if self.server.request_timeout_secs == 0 {
            return Err(invalid("server.request_timeout_secs must be greater than 0"));
        }

        let valid_backends = ["memory", "spicedb"];
        if !valid_backends.contains(&self.store.backend.as_str()) {
            return Err(invalid(format!(
                "store.backend must be one of: {:?}, got: {}",
                valid_backends, self.store.backend
            )));
        }
        if self.store.backend == "spicedb"
            && self
                .store
                .endpoint
                .as_deref()
                .map_or(true, |s| s.trim().is_empty())
        {
            return Err(invalid("store.endpoint is required when backend is 'spicedb'"));
        }
        if self.store.timeout_secs == 0 {
            return Err(invalid("store.timeout_secs must be greater than 0"));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(invalid(format!(
                "logging.level must be one of: {:?}, got: {}",
                valid_levels, self.logging.level
            )));
        }

        if self.token.subject_type.trim().is_empty() {
            return Err(invalid("token.subject_type must not be empty"));
        }

        Ok(())
    }
}

// ACLGATE_SERVER__PORT -> server.port
fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
}

fn invalid(message: impl Into<String>) -> ConfigLoadError {
    ConfigLoadError::Invalid {
        message: message.into(),
    }
}
