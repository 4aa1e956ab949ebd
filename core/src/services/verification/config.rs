//! Configuration for the verification service

use std::time::Duration;

use og_shared::config::OtpConfig;

use crate::domain::entities::{MAX_TTL, MIN_ID_LEN};

/// Configuration for the verification service
#[derive(Debug, Clone)]
pub struct VerificationServiceConfig {
    /// Lifetime of records issued without an explicit TTL
    pub default_ttl: Duration,
    /// Longest lifetime a caller may request
    pub max_ttl: Duration,
    /// Attempts allowed when the caller does not override it
    pub default_max_attempts: u32,
    /// Public base URL for status and check links, without trailing slash
    pub root_url: String,
    /// Upper bound for one provider push
    pub push_timeout: Duration,
    /// Minimum length of caller-supplied ids
    pub min_id_len: usize,
}

impl Default for VerificationServiceConfig {
    fn default() -> Self {
        Self {
            default_ttl: Duration::from_secs(300),
            max_ttl: Duration::from_secs(365 * 24 * 60 * 60),
            default_max_attempts: 5,
            root_url: "http://localhost:8080".to_string(),
            push_timeout: Duration::from_secs(5),
            min_id_len: MIN_ID_LEN,
        }
    }
}

impl From<&OtpConfig> for VerificationServiceConfig {
    fn from(config: &OtpConfig) -> Self {
        Self {
            default_ttl: config.ttl(),
            max_ttl: config.max_ttl().min(MAX_TTL),
            default_max_attempts: config.otp_max_attempts,
            root_url: config.root_url().to_string(),
            push_timeout: config.push_timeout(),
            min_id_len: config.min_id_len,
        }
    }
}
