//! Store configuration module

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Backing store selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    /// Redis hash per record
    #[default]
    Redis,
    /// Process-local map, for development and tests
    Memory,
}

/// Store configuration
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct StoreConfig {
    /// Which store implementation to use
    #[serde(default)]
    pub kind: StoreKind,

    /// Redis settings (used when `kind = "redis"`)
    #[serde(default)]
    pub redis: RedisConfig,
}

/// Redis connection settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RedisConfig {
    /// Redis connection URL
    #[serde(default = "default_url")]
    pub url: String,

    /// Prefix of every record key (`prefix:namespace:id`)
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,

    /// Pub/sub channel for check and close events; disabled when unset
    #[serde(default)]
    pub publish_key: Option<String>,

    /// Per-operation timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Connection attempts made at startup
    #[serde(default = "default_connect_retries")]
    pub connect_retries: u32,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            key_prefix: default_key_prefix(),
            publish_key: None,
            timeout: default_timeout(),
            connect_retries: default_connect_retries(),
        }
    }
}

impl RedisConfig {
    /// Create a new Redis configuration with URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Operation timeout as a `Duration`
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}

fn default_url() -> String {
    String::from("redis://localhost:6379")
}

fn default_key_prefix() -> String {
    String::from("OTP")
}

fn default_timeout() -> u64 {
    5
}

fn default_connect_retries() -> u32 {
    3
}
