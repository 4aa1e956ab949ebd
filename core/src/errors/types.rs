//! Error types for the store and channel provider seams

use thiserror::Error;

use crate::domain::entities::Otp;

/// Errors reported by an `OtpStore` implementation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The key is absent or expired
    #[error("OTP does not exist")]
    NotExist,

    /// The backing store could not be reached or rejected the command
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The operation did not complete within the configured timeout
    #[error("store operation timed out")]
    Timeout,

    /// Persisted data could not be decoded into a record
    #[error("corrupt record: {0}")]
    Corrupt(String),

    /// `set` found a live record whose attempts are exhausted; it is left untouched
    #[error("OTP is locked")]
    Locked(Box<Otp>),

    /// The requested lifetime cannot be applied as an expiry
    #[error("ttl out of range: {0:?}")]
    InvalidTtl(std::time::Duration),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Errors reported by a channel provider
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// Address rejected by the provider's syntactic check
    #[error("{0}")]
    InvalidAddress(String),

    /// The downstream API or server refused or failed the push
    #[error("delivery failed: {0}")]
    Delivery(String),

    /// The push did not finish within the push timeout
    #[error("delivery timed out")]
    Timeout,

    /// The provider is misconfigured
    #[error("provider configuration error: {0}")]
    Config(String),
}
