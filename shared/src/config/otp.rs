//! OTP lifecycle defaults

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Process-wide OTP settings, overridable per issuance request
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OtpConfig {
    /// Public base URL used to build status and check links
    #[serde(default = "default_root_url")]
    pub root_url: String,

    /// Default OTP lifetime in seconds
    #[serde(default = "default_otp_ttl")]
    pub otp_ttl: u64,

    /// Longest OTP lifetime a caller may request, in seconds
    #[serde(default = "default_otp_max_ttl")]
    pub otp_max_ttl: u64,

    /// Default maximum verification attempts
    #[serde(default = "default_otp_max_attempts")]
    pub otp_max_attempts: u32,

    /// Upper bound for a single provider push, in seconds
    #[serde(default = "default_push_timeout")]
    pub push_timeout: u64,

    /// Minimum accepted length of caller-supplied ids
    #[serde(default = "default_min_id_len")]
    pub min_id_len: usize,
}

impl Default for OtpConfig {
    fn default() -> Self {
        Self {
            root_url: default_root_url(),
            otp_ttl: default_otp_ttl(),
            otp_max_ttl: default_otp_max_ttl(),
            otp_max_attempts: default_otp_max_attempts(),
            push_timeout: default_push_timeout(),
            min_id_len: default_min_id_len(),
        }
    }
}

impl OtpConfig {
    /// Default TTL as a `Duration`
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.otp_ttl)
    }

    /// Maximum requestable TTL as a `Duration`
    pub fn max_ttl(&self) -> Duration {
        Duration::from_secs(self.otp_max_ttl)
    }

    /// Push timeout as a `Duration`
    pub fn push_timeout(&self) -> Duration {
        Duration::from_secs(self.push_timeout)
    }

    /// Root URL without a trailing slash
    pub fn root_url(&self) -> &str {
        self.root_url.trim_end_matches('/')
    }
}

fn default_otp_max_ttl() -> u64 {
    365 * 24 * 60 * 60 // one year
}

fn default_root_url() -> String {
    String::from("http://localhost:8080")
}

fn default_otp_ttl() -> u64 {
    300 // 5 minutes
}

fn default_otp_max_attempts() -> u32 {
    5
}

fn default_push_timeout() -> u64 {
    5
}

fn default_min_id_len() -> usize {
    6
}
