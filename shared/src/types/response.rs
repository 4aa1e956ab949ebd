//! API response envelope

use serde::{Deserialize, Serialize};

/// Response status enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
    Error,
}

/// Standard API response wrapper
///
/// ```json
/// {"status": "error", "message": "Incorrect OTP.", "data": {"attempts": 2}}
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// Whether the request succeeded
    pub status: ResponseStatus,

    /// Human-readable message (errors only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Response payload
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// Create a successful response
    pub fn success(data: T) -> Self {
        Self {
            status: ResponseStatus::Success,
            message: None,
            data: Some(data),
        }
    }

    /// Create an error response carrying data
    pub fn error_with_data(message: impl Into<String>, data: T) -> Self {
        Self {
            status: ResponseStatus::Error,
            message: Some(message.into()),
            data: Some(data),
        }
    }

    /// Check if the response is successful
    pub fn is_success(&self) -> bool {
        self.status == ResponseStatus::Success
    }

    /// Extract the data, consuming the response
    pub fn into_data(self) -> Option<T> {
        self.data
    }
}

impl ApiResponse<()> {
    /// Create an error response without data
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Error,
            message: Some(message.into()),
            data: None,
        }
    }
}
