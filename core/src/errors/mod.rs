//! Domain-specific error types and error handling.

mod types;


pub use types::{ProviderError, StoreError, StoreResult};

use thiserror::Error;

use crate::domain::entities::AttemptInfo;

/// Core domain errors surfaced by the verification state machine
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    /// No record for the key, or it expired
    #[error("OTP does not exist or has expired.")]
    NotExist,

    #[error("Too many attempts. Please retry after {:.0} seconds.", .0.ttl_seconds)]
    TooManyAttempts(AttemptInfo),

    #[error("Incorrect OTP.")]
    IncorrectOtp(AttemptInfo),

    #[error("Invalid `to` address: {0}")]
    InvalidAddress(String),

    #[error("Invalid `{field}` value: {message}")]
    InvalidInput { field: String, message: String },

    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    #[error("OTP not verified.")]
    NotVerified,

    #[error("Error sending OTP: {0}")]
    DeliveryFailure(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DomainError {
    /// Shorthand for an `InvalidInput` error
    pub fn invalid_input(field: impl Into<String>, message: impl Into<String>) -> Self {
        DomainError::InvalidInput {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Attempt counters attached to lock and mismatch errors
    pub fn attempt_info(&self) -> Option<&AttemptInfo> {
        match self {
            DomainError::TooManyAttempts(info) | DomainError::IncorrectOtp(info) => Some(info),
            _ => None,
        }
    }
}

impl From<StoreError> for DomainError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotExist => DomainError::NotExist,
            StoreError::Unavailable(_) | StoreError::Timeout => {
                DomainError::StoreUnavailable(err.to_string())
            }
            StoreError::Corrupt(message) => DomainError::Internal { message },
            StoreError::Locked(otp) => DomainError::TooManyAttempts(otp.attempt_info()),
            StoreError::InvalidTtl(_) => DomainError::invalid_input("ttl", "is out of range"),
        }
    }
}

impl From<ProviderError> for DomainError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::InvalidAddress(message) => DomainError::InvalidAddress(message),
            ProviderError::Delivery(_) | ProviderError::Timeout => {
                DomainError::DeliveryFailure(err.to_string())
            }
            ProviderError::Config(message) => DomainError::Internal { message },
        }
    }
}

pub type DomainResult<T> = Result<T, DomainError>;
