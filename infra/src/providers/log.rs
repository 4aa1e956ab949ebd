//! Log provider for development
//!
//! Writes each push to the log instead of delivering it. The OTP itself is
//! never logged; the body length and the masked address are.

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;

use og_core::domain::Otp;
use og_core::errors::ProviderError;
use og_core::services::Provider;
use og_shared::mask::mask_address;

/// `[providers.<id>.settings]` of a `log` provider
#[derive(Debug, Clone, Deserialize)]
pub struct LogSettings {
    #[serde(default = "default_channel_name")]
    pub channel_name: String,
    #[serde(default = "default_otp_len")]
    pub max_otp_len: usize,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            channel_name: default_channel_name(),
            max_otp_len: default_otp_len(),
        }
    }
}

fn default_channel_name() -> String {
    "Log".to_string()
}

fn default_otp_len() -> usize {
    6
}

/// Provider that only logs pushes
pub struct LogProvider {
    id: String,
    settings: LogSettings,
    pushed: AtomicU64,
}

impl LogProvider {
    pub fn new(id: impl Into<String>, settings: LogSettings) -> Self {
        Self {
            id: id.into(),
            settings,
            pushed: AtomicU64::new(0),
        }
    }

    /// Number of pushes logged so far
    pub fn pushed(&self) -> u64 {
        self.pushed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Provider for LogProvider {
    fn id(&self) -> &str {
        &self.id
    }

    fn channel_name(&self) -> &str {
        &self.settings.channel_name
    }

    fn channel_desc(&self) -> &str {
        "The code has been written to the server log."
    }

    fn address_name(&self) -> &str {
        "Address"
    }

    fn address_desc(&self) -> &str {
        "Please enter any address"
    }

    fn validate_address(&self, to: &str) -> Result<(), ProviderError> {
        if to.trim().is_empty() {
            return Err(ProviderError::InvalidAddress("address is empty".to_string()));
        }
        Ok(())
    }

    async fn push(&self, otp: &Otp, subject: &str, body: &[u8]) -> Result<(), ProviderError> {
        let count = self.pushed.fetch_add(1, Ordering::SeqCst) + 1;
        info!(
            provider = %self.id,
            namespace = %otp.namespace,
            id = %otp.id,
            to = %mask_address(&otp.to),
            subject = subject,
            body_len = body.len(),
            count = count,
            event = "otp_push_logged",
            "OTP push"
        );
        Ok(())
    }

    fn max_address_len(&self) -> usize {
        200
    }

    fn max_otp_len(&self) -> usize {
        self.settings.max_otp_len
    }

    fn max_body_len(&self) -> usize {
        4096
    }
}
