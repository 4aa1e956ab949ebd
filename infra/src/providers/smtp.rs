//! SMTP e-mail provider
//!
//! Sends the rendered body as a plain-text e-mail through a pooled async
//! `lettre` transport. Address validation is a syntactic regex check.

use async_trait::async_trait;
use lettre::message::{header::ContentType, Mailbox};
use lettre::transport::smtp::{authentication::Credentials, PoolConfig};
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, error};

use og_core::domain::Otp;
use og_core::errors::ProviderError;
use og_core::services::Provider;
use og_shared::mask::mask_address;

use crate::InfrastructureError;

const CHANNEL_NAME: &str = "E-mail";
const ADDRESS_NAME: &str = "E-mail ID";
const MAX_OTP_LEN: usize = 6;
const MAX_ADDRESS_LEN: usize = 100;
const MAX_BODY_LEN: usize = 100 * 1024;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$",
    )
    .expect("e-mail regex is valid")
});

/// Transport security of the SMTP connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TlsType {
    /// Plain connection
    None,
    /// Upgrade with STARTTLS
    #[default]
    StartTls,
    /// Implicit TLS from the first byte
    Tls,
}

/// `[providers.<id>.settings]` of an `smtp` provider
#[derive(Debug, Clone, Deserialize)]
pub struct SmtpSettings {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_from")]
    pub from_email: String,
    #[serde(default)]
    pub tls_type: TlsType,
    /// Connection timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    #[serde(default = "default_max_conns")]
    pub max_conns: u32,
}

fn default_port() -> u16 {
    587
}

fn default_from() -> String {
    "otp@localhost".to_string()
}

fn default_timeout() -> u64 {
    5
}

fn default_max_conns() -> u32 {
    10
}

/// E-mail provider over SMTP
pub struct SmtpProvider {
    id: String,
    from: Mailbox,
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    channel_desc: String,
}

impl SmtpProvider {
    /// Build the transport; no connection is made until the first push
    pub fn new(id: impl Into<String>, settings: SmtpSettings) -> Result<Self, InfrastructureError> {
        let from: Mailbox = settings
            .from_email
            .parse()
            .map_err(|e| InfrastructureError::Config(format!("invalid from_email: {}", e)))?;

        let builder = match settings.tls_type {
            TlsType::None => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&settings.host),
            TlsType::StartTls => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.host)
                .map_err(|e| InfrastructureError::Mail(e.to_string()))?,
            TlsType::Tls => AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.host)
                .map_err(|e| InfrastructureError::Mail(e.to_string()))?,
        };

        let mut builder = builder
            .port(settings.port)
            .timeout(Some(Duration::from_secs(settings.timeout)))
            .pool_config(PoolConfig::new().max_size(settings.max_conns.max(1)));

        if !settings.username.is_empty() {
            builder = builder.credentials(Credentials::new(
                settings.username.clone(),
                settings.password.clone(),
            ));
        }

        Ok(Self {
            id: id.into(),
            from,
            mailer: builder.build(),
            channel_desc: format!(
                "A {} digit code has been e-mailed to you. Please check your e-mail and enter the code here to complete the verification.",
                MAX_OTP_LEN
            ),
        })
    }
}

/// Plain-text message; rendered bodies hold caller-supplied values unescaped
fn build_message(from: Mailbox, to: Mailbox, subject: &str, body: &[u8]) -> Result<Message, ProviderError> {
    Message::builder()
        .from(from)
        .to(to)
        .subject(subject)
        .header(ContentType::TEXT_PLAIN)
        .body(String::from_utf8_lossy(body).into_owned())
        .map_err(|e| ProviderError::Delivery(e.to_string()))
}

#[async_trait]
impl Provider for SmtpProvider {
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
        "Please enter the e-mail ID you want to verify"
    }

    fn validate_address(&self, to: &str) -> Result<(), ProviderError> {
        if EMAIL_RE.is_match(to) {
            Ok(())
        } else {
            Err(ProviderError::InvalidAddress("invalid e-mail address".to_string()))
        }
    }

    async fn push(&self, otp: &Otp, subject: &str, body: &[u8]) -> Result<(), ProviderError> {
        let to: Mailbox = otp
            .to
            .parse()
            .map_err(|_| ProviderError::InvalidAddress("invalid e-mail address".to_string()))?;

        let message = build_message(self.from.clone(), to, subject, body)?;

        self.mailer.send(message).await.map_err(|e| {
            error!(provider = %self.id, to = %mask_address(&otp.to), error = %e, "SMTP send failed");
            ProviderError::Delivery(e.to_string())
        })?;

        debug!(provider = %self.id, to = %mask_address(&otp.to), "E-mail sent");
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
