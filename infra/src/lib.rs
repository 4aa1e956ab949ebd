//! # Infrastructure Layer
//!
//! Concrete adapters for the OTP gateway's two external seams:
//!
//! - **Cache**: Redis client and the Redis-backed `OtpStore`
//! - **Providers**: SMTP, webhook, SMS and log channel providers, plus the
//!   registry built from configuration

use og_core::errors::{ProviderError, StoreError};

/// Cache module - Redis client and OTP store
pub mod cache;

/// Channel provider implementations
pub mod providers;

pub use cache::{RedisClient, RedisOtpStore};
pub use providers::build_registry;

/// Infrastructure-specific error types
#[derive(Debug, thiserror::Error)]
pub enum InfrastructureError {
    /// Redis cache error
    #[error("Cache error: {0}")]
    Cache(#[from] redis::RedisError),

    /// HTTP request error for external services
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// SMTP transport or message building error
    #[error("Mail error: {0}")]
    Mail(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A store operation exceeded its timeout
    #[error("Operation timed out")]
    Timeout,
}

impl From<og_shared::ConfigError> for InfrastructureError {
    fn from(err: og_shared::ConfigError) -> Self {
        InfrastructureError::Config(err.to_string())
    }
}

impl From<InfrastructureError> for StoreError {
    fn from(err: InfrastructureError) -> Self {
        match err {
            InfrastructureError::Timeout => StoreError::Timeout,
            other => StoreError::Unavailable(other.to_string()),
        }
    }
}

impl From<InfrastructureError> for ProviderError {
    fn from(err: InfrastructureError) -> Self {
        match err {
            InfrastructureError::Config(msg) => ProviderError::Config(msg),
            InfrastructureError::Timeout => ProviderError::Timeout,
            other => ProviderError::Delivery(other.to_string()),
        }
    }
}
