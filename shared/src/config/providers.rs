//! Channel provider configuration

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;

use super::ConfigError;

/// Implementation backing a configured provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// E-mail over SMTP
    Smtp,
    /// JSON POST to an HTTP endpoint
    Webhook,
    /// SMS through an HTTP gateway
    Sms,
    /// Writes pushes to the log; development only
    Log,
}

/// A single configured provider, keyed by its id in `[providers.<id>]`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProviderConfig {
    /// Implementation kind
    pub kind: ProviderKind,

    /// Subject template (ignored by channels without subjects)
    #[serde(default)]
    pub subject: String,

    /// Body template, inline or `@path/to/file`
    #[serde(default)]
    pub template: String,

    /// Provider-specific settings
    #[serde(default)]
    pub settings: Map<String, Value>,
}

impl ProviderConfig {
    /// Resolve the body template, reading it from disk when prefixed with `@`
    pub fn body_template(&self) -> Result<String, ConfigError> {
        match self.template.strip_prefix('@') {
            Some(path) => fs::read_to_string(path).map_err(|e| ConfigError::Template {
                path: path.to_string(),
                message: e.to_string(),
            }),
            None => Ok(self.template.clone()),
        }
    }

    /// Deserialize `settings` into a provider's typed options
    pub fn settings_as<T: serde::de::DeserializeOwned>(&self) -> Result<T, ConfigError> {
        serde_json::from_value(Value::Object(self.settings.clone()))
            .map_err(|e| ConfigError::Invalid(format!("provider settings: {}", e)))
    }
}
