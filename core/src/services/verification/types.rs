//! Request and result types for the verification service

use serde::Serialize;

use crate::domain::entities::Otp;

/// Parameters of an issuance request; unset fields fall back to defaults
#[derive(Debug, Clone, Default)]
pub struct IssueRequest {
    /// Provider id (required)
    pub provider: String,
    /// Record id; generated when absent
    pub id: Option<String>,
    /// Delivery address; when absent the address is collected later
    pub to: Option<String>,
    /// Secret; generated when absent
    pub otp: Option<String>,
    /// Lifetime in seconds
    pub ttl: Option<u64>,
    pub max_attempts: Option<u32>,
    /// Raw JSON payload
    pub extra: Option<String>,
    pub channel_description: Option<String>,
    pub address_description: Option<String>,
}

/// Result of a successful issuance
#[derive(Debug, Clone, Serialize)]
pub struct IssuedOtp {
    #[serde(flatten)]
    pub otp: Otp,
    /// Status-check URL of the record
    pub url: String,
}

/// Outcome of an address submission
#[derive(Debug, Clone, PartialEq)]
pub enum AddressOutcome {
    /// Address stored and the OTP pushed
    Delivered(Otp),
    /// The record was already addressed or closed; nothing changed
    Unchanged(Otp),
}

impl AddressOutcome {
    pub fn otp(&self) -> &Otp {
        match self {
            AddressOutcome::Delivered(otp) | AddressOutcome::Unchanged(otp) => otp,
        }
    }
}
