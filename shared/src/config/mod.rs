//! Configuration module with gateway-specific sub-modules
//!
//! This module organizes configuration into logical areas:
//! - `environment` - Environment detection and logging configuration
//! - `otp` - OTP lifetime and attempt defaults
//! - `providers` - Channel provider definitions
//! - `server` - HTTP server configuration
//! - `store` - Record store selection and Redis settings
//!
//! Values are read from an optional TOML file and then from environment
//! variables prefixed with `OTP_GATEWAY_`, using `__` to separate nested
//! keys (`OTP_GATEWAY_APP__OTP_TTL=120`).

pub mod environment;
pub mod otp;
pub mod providers;
pub mod server;
pub mod store;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

pub use environment::{Environment, LogFormat, LoggingConfig};
pub use otp::OtpConfig;
pub use providers::{ProviderConfig, ProviderKind};
pub use server::ServerConfig;
pub use store::{RedisConfig, StoreConfig, StoreKind};

/// Environment variable naming an alternative config file
pub const CONFIG_PATH_VAR: &str = "OTP_GATEWAY_CONFIG";

/// Default config file, resolved relative to the working directory
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Configuration loading and validation errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to read template {path}: {message}")]
    Template { path: String, message: String },
}

/// API credentials for one namespace
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthCredential {
    /// Namespace the credential grants access to
    pub namespace: String,
    /// Shared secret
    pub secret: String,
}

/// Complete application configuration combining all sub-configurations
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Environment configuration
    #[serde(default)]
    pub environment: Environment,

    /// OTP defaults
    #[serde(default)]
    pub app: OtpConfig,

    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Store configuration
    #[serde(default)]
    pub store: StoreConfig,

    /// Providers keyed by id
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,

    /// Namespace credentials
    #[serde(default)]
    pub auth: Vec<AuthCredential>,

    /// Logging configuration; derived from `environment` when absent
    #[serde(default)]
    pub logging: Option<LoggingConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            environment: Environment::default(),
            app: OtpConfig::default(),
            server: ServerConfig::default(),
            store: StoreConfig::default(),
            providers: HashMap::new(),
            auth: Vec::new(),
            logging: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from the file named by `OTP_GATEWAY_CONFIG`
    /// (or `config.toml`) and the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let path = std::env::var(CONFIG_PATH_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let builder = config::Config::builder()
            .add_source(config::File::with_name(&path).required(false));

        Self::build(builder)
    }

    /// Load configuration from a TOML string and the process environment
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        let builder = config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml));

        Self::build(builder)
    }

    fn build(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self, ConfigError> {
        let config: Self = builder
            .add_source(
                config::Environment::with_prefix("OTP_GATEWAY")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Check cross-field invariants that serde cannot express
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.app.otp_ttl < 1 {
            return Err(ConfigError::Invalid("app.otp_ttl should be >= 1".into()));
        }
        if self.app.otp_ttl > self.app.otp_max_ttl {
            return Err(ConfigError::Invalid(
                "app.otp_ttl should be <= app.otp_max_ttl".into(),
            ));
        }
        if self.app.otp_max_attempts < 1 {
            return Err(ConfigError::Invalid(
                "app.otp_max_attempts should be >= 1".into(),
            ));
        }
        if self.auth.is_empty() {
            return Err(ConfigError::Invalid(
                "no [[auth]] credentials configured".into(),
            ));
        }
        if let Some(cred) = self
            .auth
            .iter()
            .find(|c| c.namespace.is_empty() || c.secret.is_empty())
        {
            return Err(ConfigError::Invalid(format!(
                "auth entry for namespace '{}' has an empty namespace or secret",
                cred.namespace
            )));
        }
        if self.providers.is_empty() {
            return Err(ConfigError::Invalid("no providers configured".into()));
        }
        Ok(())
    }

    /// Effective logging configuration
    pub fn logging(&self) -> LoggingConfig {
        self.logging
            .clone()
            .unwrap_or_else(|| LoggingConfig::for_environment(self.environment))
    }

    /// Namespace to secret lookup table
    pub fn auth_map(&self) -> HashMap<String, String> {
        self.auth
            .iter()
            .map(|c| (c.namespace.clone(), c.secret.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        environment = "production"

        [app]
        root_url = "https://otp.example.com/"
        otp_ttl = 120
        otp_max_attempts = 3

        [store]
        kind = "memory"

        [providers.console]
        kind = "log"
        subject = "Your {{channel}} code"
        template = "Code: {{otp}}"

        [[auth]]
        namespace = "myapp"
        secret = "mysecret"
    "#;

    #[test]
    fn test_load_from_toml() {
        let config = AppConfig::from_toml(SAMPLE).unwrap();

        assert_eq!(config.environment, Environment::Production);
        assert_eq!(config.app.otp_ttl, 120);
        assert_eq!(config.app.otp_max_attempts, 3);
        assert_eq!(config.app.root_url(), "https://otp.example.com");
        assert_eq!(config.app.min_id_len, 6);
        assert_eq!(config.store.kind, StoreKind::Memory);
        assert_eq!(config.store.redis.key_prefix, "OTP");
        assert_eq!(config.providers["console"].kind, ProviderKind::Log);
        assert_eq!(config.auth_map().get("myapp").map(String::as_str), Some("mysecret"));
        assert_eq!(config.logging().format, LogFormat::Json);
    }

    #[test]
    fn test_missing_auth_is_rejected() {
        let toml = r#"
            [providers.console]
            kind = "log"
        "#;
        let err = AppConfig::from_toml(toml).unwrap_err();
        assert!(err.to_string().contains("auth"));
    }

    #[test]
    fn test_default_ttl_above_max_is_rejected() {
        let mut config = AppConfig::from_toml(SAMPLE).unwrap();
        config.app.otp_max_ttl = 60;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_zero_ttl_is_rejected() {
        let mut config = AppConfig::from_toml(SAMPLE).unwrap();
        config.app.otp_ttl = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.app.otp_ttl, 300);
        assert_eq!(config.app.otp_max_ttl, 31_536_000);
        assert_eq!(config.app.otp_max_attempts, 5);
        assert_eq!(config.server.bind_address(), "0.0.0.0:8080");
    }
}
