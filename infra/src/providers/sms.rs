//! SMS provider over a Twilio-style HTTP gateway
//!
//! Messages are sent as a form POST (`To`, `From`, `Body`) authenticated
//! with the account SID and auth token. Numbers must be E.164.

use async_trait::async_trait;
use phonenumber::{Mode, PhoneNumber};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

use og_core::domain::Otp;
use og_core::errors::ProviderError;
use og_core::services::Provider;
use og_shared::mask::mask_address;

use crate::InfrastructureError;

const CHANNEL_NAME: &str = "SMS";
const ADDRESS_NAME: &str = "Mobile number";
/// `+` and up to 15 digits
const MAX_ADDRESS_LEN: usize = 16;
const MAX_OTP_LEN: usize = 6;
const MAX_BODY_LEN: usize = 160;

const DEFAULT_API_BASE: &str = "https://api.twilio.com/2010-04-01";

/// `[providers.<id>.settings]` of an `sms` provider
#[derive(Debug, Clone, Deserialize)]
pub struct SmsSettings {
    pub account_sid: String,
    pub auth_token: String,
    /// Sender number in E.164 format
    pub from_number: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_timeout() -> u64 {
    5
}

/// Parse and normalize a number to E.164
pub fn normalize_e164(phone: &str) -> Result<String, ProviderError> {
    if !phone.starts_with('+') {
        return Err(ProviderError::InvalidAddress(
            "Phone number must be in E.164 format (e.g., +14155552671)".to_string(),
        ));
    }

    let parsed: PhoneNumber = phone
        .parse()
        .map_err(|e| ProviderError::InvalidAddress(format!("Invalid phone number format: {}", e)))?;
    if !phonenumber::is_valid(&parsed) {
        return Err(ProviderError::InvalidAddress("Invalid phone number".to_string()));
    }

    Ok(parsed.format().mode(Mode::E164).to_string())
}

/// SMS provider
pub struct SmsProvider {
    id: String,
    settings: SmsSettings,
    http: reqwest::Client,
    messages_url: String,
    channel_desc: String,
}

impl SmsProvider {
    pub fn new(id: impl Into<String>, settings: SmsSettings) -> Result<Self, InfrastructureError> {
        if settings.account_sid.is_empty() || settings.auth_token.is_empty() {
            return Err(InfrastructureError::Config(
                "sms account_sid and auth_token are required".to_string(),
            ));
        }
        normalize_e164(&settings.from_number)
            .map_err(|_| InfrastructureError::Config("sms from_number must be E.164".to_string()))?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout.max(1)))
            .build()?;

        let messages_url = format!(
            "{}/Accounts/{}/Messages.json",
            settings.api_base.trim_end_matches('/'),
            settings.account_sid
        );

        info!(
            from = %mask_address(&settings.from_number),
            "SMS provider initialized"
        );

        Ok(Self {
            id: id.into(),
            settings,
            http,
            messages_url,
            channel_desc: format!(
                "A {} digit code has been sent to your phone. Enter it here to verify your mobile number.",
                MAX_OTP_LEN
            ),
        })
    }
}

#[async_trait]
impl Provider for SmsProvider {
    fn id(&self) -> &str {
        &self.id
    }

    fn channel_name(&self) -> &str {
        CHANNEL_NAME
    }

    fn channel_desc(&self) -> &str {
        &self.channel_desc
    }

    fn address_name(&self) -> &str {
        ADDRESS_NAME
    }

    fn address_desc(&self) -> &str {
        "Please enter your mobile number with the country code"
    }

    fn validate_address(&self, to: &str) -> Result<(), ProviderError> {
        normalize_e164(to).map(|_| ())
    }

    async fn push(&self, otp: &Otp, _subject: &str, body: &[u8]) -> Result<(), ProviderError> {
        let to = normalize_e164(&otp.to)?;
        let body = String::from_utf8_lossy(body);
        let form = [
            ("To", to.as_str()),
            ("From", self.settings.from_number.as_str()),
            ("Body", body.as_ref()),
        ];

        let response = self
            .http
            .post(&self.messages_url)
            .basic_auth(&self.settings.account_sid, Some(&self.settings.auth_token))
            .form(&form)
            .send()
            .await
            .map_err(|e| {
                warn!(provider = %self.id, to = %mask_address(&to), error = %e, "SMS request failed");
                if e.is_timeout() {
                    ProviderError::Timeout
                } else {
                    ProviderError::Delivery(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            warn!(
                provider = %self.id,
                to = %mask_address(&to),
                status = status.as_u16(),
                "SMS gateway rejected the message"
            );
            return Err(ProviderError::Delivery(format!(
                "SMS gateway responded with {}: {}",
                status, detail
            )));
        }

        debug!(provider = %self.id, to = %mask_address(&to), "SMS sent");
        Ok(())
    }

    fn max_address_len(&self) -> usize {
        MAX_ADDRESS_LEN
    }

    fn max_otp_len(&self) -> usize {
        MAX_OTP_LEN
    }

    fn max_body_len(&self) -> usize {
        MAX_BODY_LEN
    }
}
