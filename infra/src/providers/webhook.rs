//! Webhook provider
//!
//! POSTs `{otp, subject, body}` as JSON to a configured URL. Any number of
//! webhook providers can be configured side by side under different ids.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::header::{AUTHORIZATION, USER_AGENT};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use og_core::domain::Otp;
use og_core::errors::ProviderError;
use og_core::services::Provider;

use crate::InfrastructureError;

const MAX_BODY_LEN: usize = 100 * 1024;

/// `[providers.<id>.settings]` of a `webhook` provider
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookSettings {
    pub url: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_channel_name")]
    pub channel_name: String,
    #[serde(default = "default_address_name")]
    pub address_name: String,
    #[serde(default = "default_max_address_len")]
    pub max_address_len: usize,
    #[serde(default = "default_max_otp_len")]
    pub max_otp_len: usize,
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

fn default_channel_name() -> String {
    "Webhook".to_string()
}

fn default_address_name() -> String {
    "Address".to_string()
}

fn default_max_address_len() -> usize {
    200
}

fn default_max_otp_len() -> usize {
    6
}

fn default_timeout() -> u64 {
    3
}

/// JSON document posted to the webhook URL
#[derive(Debug, Serialize)]
struct Payload<'a> {
    otp: &'a Otp,
    subject: &'a str,
    body: String,
}

/// Provider that forwards pushes to an HTTP endpoint
pub struct WebhookProvider {
    id: String,
    settings: WebhookSettings,
    auth_header: Option<String>,
    http: reqwest::Client,
    channel_desc: String,
    address_desc: String,
}

impl WebhookProvider {
    pub fn new(id: impl Into<String>, settings: WebhookSettings) -> Result<Self, InfrastructureError> {
        if settings.url.is_empty() {
            return Err(InfrastructureError::Config("webhook url is empty".to_string()));
        }

        let auth_header = (!settings.username.is_empty() && !settings.password.is_empty()).then(|| {
            format!(
                "Basic {}",
                STANDARD.encode(format!("{}:{}", settings.username, settings.password))
            )
        });

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout.max(1)))
            .build()?;

        let channel_desc = format!(
            "A {} digit code has been sent to your {}. Enter it here to verify your {}.",
            settings.max_otp_len, settings.channel_name, settings.address_name
        );
        let address_desc = format!("Please enter your {}", settings.address_name);

        Ok(Self {
            id: id.into(),
            settings,
            auth_header,
            http,
            channel_desc,
            address_desc,
        })
    }
}

#[async_trait]
impl Provider for WebhookProvider {
    fn id(&self) -> &str {
        &self.id
    }

    fn channel_name(&self) -> &str {
        &self.settings.channel_name
    }

    fn channel_desc(&self) -> &str {
        &self.channel_desc
    }

    fn address_name(&self) -> &str {
        &self.settings.address_name
    }

    fn address_desc(&self) -> &str {
        &self.address_desc
    }

    fn validate_address(&self, to: &str) -> Result<(), ProviderError> {
        if to.trim().is_empty() {
            return Err(ProviderError::InvalidAddress("address is empty".to_string()));
        }
        Ok(())
    }

    async fn push(&self, otp: &Otp, subject: &str, body: &[u8]) -> Result<(), ProviderError> {
        let payload = Payload {
            otp,
            subject,
            body: String::from_utf8_lossy(body).into_owned(),
        };

        let mut request = self
            .http
            .post(&self.settings.url)
            .header(USER_AGENT, "otp-gateway")
            .json(&payload);
        if let Some(auth) = &self.auth_header {
            request = request.header(AUTHORIZATION, auth);
        }

        let response = request.send().await.map_err(|e| {
            warn!(provider = %self.id, error = %e, "Webhook request failed");
            if e.is_timeout() {
                ProviderError::Timeout
            } else {
                ProviderError::Delivery(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            warn!(provider = %self.id, status = status.as_u16(), "Webhook returned non-2xx");
            return Err(ProviderError::Delivery(format!(
                "webhook responded with {}",
                status
            )));
        }

        debug!(provider = %self.id, namespace = %otp.namespace, id = %otp.id, "Webhook delivered");
        Ok(())
    }

    fn max_address_len(&self) -> usize {
        self.settings.max_address_len
    }

    fn max_otp_len(&self) -> usize {
        self.settings.max_otp_len
    }

    fn max_body_len(&self) -> usize {
        MAX_BODY_LEN
    }
}
