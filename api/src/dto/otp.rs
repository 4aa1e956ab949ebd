//! Form bodies of the OTP endpoints
//!
//! All bodies are `application/x-www-form-urlencoded`. Numeric fields
//! arrive as strings so that a malformed value maps to the same
//! `Invalid `<field>` value` error as an out-of-range one.

use serde::Deserialize;
use validator::Validate;

use og_core::errors::DomainError;
use og_core::services::IssueRequest;

/// `PUT /api/otp/{id}`
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct IssueForm {
    #[serde(default)]
    pub provider: String,
    #[validate(length(max = 200))]
    pub to: Option<String>,
    #[validate(length(max = 64))]
    pub otp: Option<String>,
    pub ttl: Option<String>,
    pub max_attempts: Option<String>,
    #[validate(length(max = 65536))]
    pub extra: Option<String>,
    #[validate(length(max = 1000))]
    pub channel_description: Option<String>,
    #[validate(length(max = 1000))]
    pub address_description: Option<String>,
}

impl IssueForm {
    /// Convert into a service request for the record `id`
    pub fn into_request(self, id: Option<String>) -> Result<IssueRequest, DomainError> {
        Ok(IssueRequest {
            ttl: parse_number("ttl", self.ttl.as_deref())?,
            max_attempts: parse_number("max_attempts", self.max_attempts.as_deref())?,
            provider: self.provider,
            id,
            to: self.to,
            otp: self.otp,
            extra: self.extra,
            channel_description: self.channel_description,
            address_description: self.address_description,
        })
    }
}

/// `POST /api/otp/{id}`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VerifyForm {
    #[serde(default)]
    pub otp: String,
    pub skip_delete: Option<String>,
}

impl VerifyForm {
    /// Whether the record should be deleted once verified
    pub fn delete_on_success(&self) -> bool {
        !parse_bool(self.skip_delete.as_deref())
    }
}

/// `POST /otp/{namespace}/{id}`; also read from the query string
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OtpViewForm {
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub otp: String,
}

/// `POST /otp/{namespace}/{id}/address`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AddressForm {
    #[serde(default)]
    pub to: String,
}

fn parse_number<T: std::str::FromStr>(field: &str, raw: Option<&str>) -> Result<Option<T>, DomainError> {
    match raw.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(v) => v
            .parse()
            .map(Some)
            .map_err(|_| DomainError::invalid_input(field, "should be a positive number")),
    }
}

/// Accepts the usual boolean spellings; anything else is false
fn parse_bool(raw: Option<&str>) -> bool {
    matches!(
        raw.map(str::trim),
        Some("1") | Some("t") | Some("T") | Some("true") | Some("TRUE") | Some("True")
    )
}
