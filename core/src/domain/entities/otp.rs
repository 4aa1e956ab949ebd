//! OTP record entity.
//!
//! A record is addressed by `(namespace, id)`. Only `to`, `attempts` and
//! `closed` change after creation; the remaining lifetime (`ttl`) is not a
//! stored field but is read back from the store's expiry clock on every read.

use serde::{Serialize, Serializer};
use serde_json::value::RawValue;
use std::time::Duration;

/// Payload stored in `extra` when the caller sends none
pub const DEFAULT_EXTRA: &str = "{}";

/// Minimum length of a caller-supplied id
pub const MIN_ID_LEN: usize = 6;

/// Length of generated ids
pub const GENERATED_ID_LEN: usize = 32;

/// Longest lifetime a store accepts as a key expiry (ten years)
pub const MAX_TTL: Duration = Duration::from_secs(10 * 365 * 24 * 60 * 60);

/// A single verification attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
pub struct Otp {
    /// Tenant/application scope
    pub namespace: String,

    /// Caller-supplied or generated identifier
    pub id: String,

    /// Delivery address; empty until known
    pub to: String,

    /// Free-text description of the channel
    pub channel_description: String,

    /// Free-text description of the address
    pub address_description: String,

    /// Opaque JSON echoed back verbatim
    #[serde(serialize_with = "serialize_raw_json")]
    pub extra: String,

    /// Id of the provider used for delivery
    pub provider: String,

    /// The secret value
    pub otp: String,

    /// Attempts allowed before the record locks
    pub max_attempts: u32,

    /// Attempts consumed so far, including issuance
    pub attempts: u32,

    /// Set once verified; never reverts
    pub closed: bool,

    /// Remaining lifetime; on `set` this is the requested lifetime
    #[serde(rename = "ttl", serialize_with = "serialize_ttl")]
    pub ttl: Duration,
}

/// Lifecycle state derived from a record's fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpState {
    /// Exists, no delivery address yet
    PendingNoAddress,
    /// Exists, addressed, waiting for a guess
    PendingAwaiting,
    /// Attempts exhausted; refuses guesses until expiry
    Locked,
    /// Verified
    Closed,
}

/// Attempt counters reported with lock and mismatch errors
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttemptInfo {
    pub ttl_seconds: f64,
    pub attempts: u32,
    pub max_attempts: u32,
}

impl Otp {
    /// True once `attempts` has reached `max_attempts`
    pub fn is_locked(&self) -> bool {
        self.attempts >= self.max_attempts
    }

    /// Derive the lifecycle state
    pub fn state(&self) -> OtpState {
        if self.closed {
            OtpState::Closed
        } else if self.is_locked() {
            OtpState::Locked
        } else if self.to.is_empty() {
            OtpState::PendingNoAddress
        } else {
            OtpState::PendingAwaiting
        }
    }

    /// Remaining lifetime in fractional seconds
    pub fn ttl_seconds(&self) -> f64 {
        self.ttl.as_secs_f64()
    }

    /// Remaining lifetime rounded to whole seconds, for display
    pub fn ttl_display_secs(&self) -> u64 {
        self.ttl.as_secs_f64().round() as u64
    }

    /// Snapshot of the attempt counters
    pub fn attempt_info(&self) -> AttemptInfo {
        AttemptInfo {
            ttl_seconds: self.ttl_seconds(),
            attempts: self.attempts,
            max_attempts: self.max_attempts,
        }
    }
}

fn serialize_raw_json<S: Serializer>(extra: &str, serializer: S) -> Result<S::Ok, S::Error> {
    let raw = if extra.is_empty() { DEFAULT_EXTRA } else { extra };
    match RawValue::from_string(raw.to_string()) {
        Ok(value) => value.serialize(serializer),
        Err(_) => serializer.serialize_str(raw),
    }
}

fn serialize_ttl<S: Serializer>(ttl: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(ttl.as_secs_f64())
}
