//! Store trait defining the contract for OTP record persistence.

use async_trait::async_trait;

use crate::domain::entities::Otp;
use crate::errors::StoreResult;

/// Build the `prefix:namespace:id` key of a record
pub fn record_key(prefix: &str, namespace: &str, id: &str) -> String {
    format!("{}:{}:{}", prefix, namespace, id)
}

/// Durable, TTL-bound keeper of OTP records
///
/// Implementations must make every mutation atomic per key: concurrent
/// `check(.., true)` calls on one key each observe a distinct attempts
/// count, and the TTL returned alongside a mutation is read in the same
/// unit. "Not found" and "expired" are both reported as
/// [`StoreError::NotExist`](crate::errors::StoreError::NotExist);
/// connectivity failures are reported as-is and never retried here.
#[async_trait]
pub trait OtpStore: Send + Sync {
    /// Create or overwrite a record
    ///
    /// Writes every field with `closed = false`, resets and increments
    /// `attempts` (so the result reports 1), and applies `otp.ttl` as the
    /// key's absolute expiry, all as one transaction. A live record whose
    /// attempts are exhausted is left as it is.
    ///
    /// # Returns
    /// * `Ok(Otp)` - The stored record with its attempts count and remaining TTL
    /// * `Err(StoreError::Locked)` - The existing record is locked
    /// * `Err(StoreError::InvalidTtl)` - `otp.ttl` cannot be applied as an expiry
    async fn set(&self, namespace: &str, id: &str, otp: Otp) -> StoreResult<Otp>;

    /// Read a record, optionally consuming one attempt
    ///
    /// With `increment`, the attempts counter is incremented and the TTL
    /// read in the same transaction, and a `check` event is published.
    /// A failed publish fails the call.
    async fn check(&self, namespace: &str, id: &str, increment: bool) -> StoreResult<Otp>;

    /// Update the delivery address only; attempts and TTL are untouched
    async fn set_address(&self, namespace: &str, id: &str, address: &str) -> StoreResult<()>;

    /// Mark a record verified without deleting it or changing its TTL
    ///
    /// Publishes a `close` event on a best-effort basis.
    async fn close(&self, namespace: &str, id: &str) -> StoreResult<()>;

    /// Remove a record unconditionally
    async fn delete(&self, namespace: &str, id: &str) -> StoreResult<()>;

    /// Liveness check of the backing store
    async fn ping(&self) -> StoreResult<()>;
}
