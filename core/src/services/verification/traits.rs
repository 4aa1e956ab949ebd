//! Channel provider contract

use async_trait::async_trait;

use crate::domain::entities::Otp;
use crate::errors::ProviderError;

/// A delivery backend (e-mail, SMS, webhook, ...)
///
/// Providers make a single delivery attempt per `push` and never retry.
/// Message rendering happens before `push` is called.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Unique provider id, as configured
    fn id(&self) -> &str;

    /// Display name of the channel ("E-mail")
    fn channel_name(&self) -> &str;

    /// Description of the channel shown to end users
    fn channel_desc(&self) -> &str;

    /// Display name of the address ("E-mail ID")
    fn address_name(&self) -> &str;

    /// Description of the address shown to end users
    fn address_desc(&self) -> &str;

    /// Syntactic validation of a delivery address; no network access
    fn validate_address(&self, to: &str) -> Result<(), ProviderError>;

    /// Deliver a rendered message for `otp` to `otp.to`
    async fn push(&self, otp: &Otp, subject: &str, body: &[u8]) -> Result<(), ProviderError>;

    /// Maximum accepted address length
    fn max_address_len(&self) -> usize;

    /// Length of generated OTPs
    fn max_otp_len(&self) -> usize;

    /// Maximum rendered body length in bytes
    fn max_body_len(&self) -> usize;
}
