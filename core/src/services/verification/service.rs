//! Main verification service implementation

use constant_time_eq::constant_time_eq;
use std::sync::Arc;

use og_shared::mask::mask_address;
use og_shared::random::{random_string, ALPHANUMERIC, NUMERIC};

use crate::domain::entities::{Otp, DEFAULT_EXTRA, GENERATED_ID_LEN};
use crate::errors::{DomainError, DomainResult, ProviderError, StoreError};
use crate::repositories::OtpStore;

use super::config::VerificationServiceConfig;
use super::registry::{ProviderRegistry, RegisteredProvider};
use super::render::PushContext;
use super::types::{AddressOutcome, IssueRequest, IssuedOtp};

/// Issuance, verification, locking and closing of OTP records
///
/// The service keeps no record state between calls; every decision is
/// taken on a fresh read from the store, and the only ordering it relies
/// on is the store's atomic attempts counter.
pub struct VerificationService<S: OtpStore> {
    /// Record store
    store: Arc<S>,
    /// Providers keyed by id
    providers: Arc<ProviderRegistry>,
    /// Service configuration
    config: VerificationServiceConfig,
}

impl<S: OtpStore> VerificationService<S> {
    /// Create a new verification service
    ///
    /// # Arguments
    ///
    /// * `store` - Record store implementation
    /// * `providers` - Registry of configured channel providers
    /// * `config` - Service configuration
    pub fn new(
        store: Arc<S>,
        providers: Arc<ProviderRegistry>,
        config: VerificationServiceConfig,
    ) -> Self {
        Self {
            store,
            providers,
            config,
        }
    }

    /// Service configuration
    pub fn config(&self) -> &VerificationServiceConfig {
        &self.config
    }

    /// Issue (or re-issue) an OTP for `namespace`
    ///
    /// This method:
    /// 1. Resolves the provider and validates the address, TTL, attempts and `extra`
    /// 2. Generates the id and the secret when they are not supplied
    /// 3. Stores the record unless an existing one with this id is locked
    /// 4. Pushes it when an address is known
    ///
    /// A failed push fails the call even though the record was stored;
    /// callers may retry delivery through a resend.
    ///
    /// # Returns
    ///
    /// * `Ok(IssuedOtp)` - The stored record and its status URL
    /// * `Err(DomainError)` - Validation, lock, store or delivery failure
    pub async fn issue(&self, namespace: &str, req: IssueRequest) -> DomainResult<IssuedOtp> {
        let registered = self.provider(&req.provider)?;
        let provider = &registered.provider;

        let to = non_empty(req.to).unwrap_or_default();
        if !to.is_empty() {
            self.validate_address(registered, &to)?;
        }

        let ttl = match req.ttl {
            Some(0) => return Err(DomainError::invalid_input("ttl", "should be >= 1")),
            Some(secs) if secs > self.config.max_ttl.as_secs() => {
                return Err(DomainError::invalid_input(
                    "ttl",
                    format!("should be <= {}", self.config.max_ttl.as_secs()),
                ))
            }
            Some(secs) => std::time::Duration::from_secs(secs),
            None => self.config.default_ttl,
        };

        let max_attempts = match req.max_attempts {
            Some(0) => return Err(DomainError::invalid_input("max_attempts", "should be >= 1")),
            Some(n) => n,
            None => self.config.default_max_attempts,
        };

        let extra = match non_empty(req.extra) {
            Some(extra) => {
                serde_json::from_str::<serde::de::IgnoredAny>(&extra)
                    .map_err(|e| DomainError::invalid_input("extra", format!("invalid JSON: {}", e)))?;
                extra
            }
            None => DEFAULT_EXTRA.to_string(),
        };

        let id = match non_empty(req.id) {
            Some(id) => {
                self.validate_id(&id)?;
                id
            }
            None => random_string(GENERATED_ID_LEN, ALPHANUMERIC),
        };

        let secret = non_empty(req.otp)
            .unwrap_or_else(|| random_string(provider.max_otp_len(), NUMERIC));

        // The store refuses to overwrite a locked record in the same atomic
        // unit as the write, so re-issuing never resets the counter.
        let result = self
            .store
            .set(
                namespace,
                &id,
                Otp {
                    namespace: namespace.to_string(),
                    id: id.clone(),
                    to,
                    channel_description: req.channel_description.unwrap_or_default(),
                    address_description: req.address_description.unwrap_or_default(),
                    extra,
                    provider: req.provider.clone(),
                    otp: secret,
                    max_attempts,
                    attempts: 0,
                    closed: false,
                    ttl,
                },
            )
            .await;

        let otp = match result {
            Ok(otp) => otp,
            Err(StoreError::Locked(existing)) => {
                tracing::warn!(
                    namespace = namespace,
                    id = %id,
                    attempts = existing.attempts,
                    event = "otp_issue_locked",
                    "Refusing to re-issue a locked OTP"
                );
                return Err(DomainError::TooManyAttempts(existing.attempt_info()));
            }
            Err(e) => {
                tracing::error!(
                    namespace = namespace,
                    id = %id,
                    error = %e,
                    event = "otp_storage_failed",
                    "Failed to store OTP"
                );
                return Err(e.into());
            }
        };

        tracing::info!(
            namespace = namespace,
            id = %otp.id,
            provider = %otp.provider,
            ttl_seconds = otp.ttl_display_secs(),
            event = "otp_generated",
            "Issued OTP"
        );

        if !otp.to.is_empty() {
            self.push(&otp, registered).await?;
        }

        let url = self.status_url(&otp);
        Ok(IssuedOtp { otp, url })
    }

    /// Read a record and succeed only if it has been verified
    ///
    /// With `delete_on_read`, a closed record is removed after it is read,
    /// so a status poll succeeds at most once.
    pub async fn check_status(
        &self,
        namespace: &str,
        id: &str,
        delete_on_read: bool,
    ) -> DomainResult<Otp> {
        self.validate_id(id)?;

        let otp = self.store.check(namespace, id, false).await?;
        if !otp.closed {
            return Err(DomainError::NotVerified);
        }

        if delete_on_read {
            self.store.delete(namespace, id).await?;
            tracing::debug!(namespace = namespace, id = id, "Deleted OTP after status read");
        }

        Ok(otp)
    }

    /// Validate a guess, consuming one attempt whether it is right or wrong
    ///
    /// The lock is evaluated after the increment. A closed but undeleted
    /// record is compared again: a correct guess succeeds, and `closed`
    /// never reverts.
    ///
    /// # Arguments
    ///
    /// * `guess` - The user-submitted OTP
    /// * `delete_on_success` - Remove the record once it is closed
    ///
    /// # Returns
    ///
    /// * `Ok(Otp)` - The record, with `closed = true`
    /// * `Err(DomainError::NotExist)` - No such record, or it expired
    /// * `Err(DomainError::TooManyAttempts)` - The record is locked
    /// * `Err(DomainError::IncorrectOtp)` - Wrong guess
    pub async fn verify(
        &self,
        namespace: &str,
        id: &str,
        guess: &str,
        delete_on_success: bool,
    ) -> DomainResult<Otp> {
        self.validate_id(id)?;
        if guess.is_empty() {
            return Err(DomainError::invalid_input("otp", "is empty"));
        }

        let mut otp = self.store.check(namespace, id, true).await?;

        if otp.is_locked() {
            tracing::warn!(
                namespace = namespace,
                id = id,
                attempts = otp.attempts,
                max_attempts = otp.max_attempts,
                event = "max_attempts_exceeded",
                "OTP is locked"
            );
            return Err(DomainError::TooManyAttempts(otp.attempt_info()));
        }

        if !constant_time_eq(otp.otp.as_bytes(), guess.as_bytes()) {
            tracing::info!(
                namespace = namespace,
                id = id,
                attempts = otp.attempts,
                event = "otp_verification_failed",
                "Incorrect OTP"
            );
            return Err(DomainError::IncorrectOtp(otp.attempt_info()));
        }

        // Close first so the close event refers to a live key.
        self.store.close(namespace, id).await?;
        if delete_on_success {
            self.store.delete(namespace, id).await?;
        }
        otp.closed = true;

        tracing::info!(
            namespace = namespace,
            id = id,
            deleted = delete_on_success,
            event = "otp_verified_success",
            "OTP verified"
        );
        Ok(otp)
    }

    /// Attach a delivery address to a record issued without one, then push
    ///
    /// Records that are closed or already addressed are returned unchanged
    /// and nothing is pushed.
    pub async fn set_address(
        &self,
        namespace: &str,
        id: &str,
        to: &str,
    ) -> DomainResult<AddressOutcome> {
        let mut otp = self.store.check(namespace, id, false).await?;
        if otp.closed || !otp.to.is_empty() {
            return Ok(AddressOutcome::Unchanged(otp));
        }

        let registered = self.provider(&otp.provider)?;
        self.validate_address(registered, to)?;

        self.store.set_address(namespace, id, to).await?;
        otp.to = to.to_string();

        tracing::info!(
            namespace = namespace,
            id = id,
            to = %mask_address(to),
            event = "otp_address_set",
            "Address set for OTP"
        );

        self.push(&otp, registered).await?;
        Ok(AddressOutcome::Delivered(otp))
    }

    /// Push the OTP again; this consumes an attempt
    ///
    /// Locked records fail with `TooManyAttempts`. Closed or unaddressed
    /// records are returned without a push; callers inspect the state.
    pub async fn resend(&self, namespace: &str, id: &str) -> DomainResult<Otp> {
        let otp = self.store.check(namespace, id, true).await?;
        if otp.is_locked() {
            return Err(DomainError::TooManyAttempts(otp.attempt_info()));
        }
        if otp.closed || otp.to.is_empty() {
            return Ok(otp);
        }

        let registered = self.provider(&otp.provider)?;
        self.push(&otp, registered).await?;
        Ok(otp)
    }

    /// Read a record without consuming an attempt
    pub async fn peek(&self, namespace: &str, id: &str) -> DomainResult<Otp> {
        Ok(self.store.check(namespace, id, false).await?)
    }

    /// Whether a record has been verified; used by UI polling
    pub async fn closed_status(&self, namespace: &str, id: &str) -> DomainResult<bool> {
        Ok(self.store.check(namespace, id, false).await?.closed)
    }

    /// Ids of the configured providers
    pub fn provider_ids(&self) -> Vec<String> {
        self.providers.ids()
    }

    /// Look up a configured provider
    pub fn provider(&self, id: &str) -> DomainResult<&RegisteredProvider> {
        self.providers
            .get(id)
            .ok_or_else(|| DomainError::UnknownProvider(id.to_string()))
    }

    /// Store liveness
    pub async fn health(&self) -> DomainResult<()> {
        Ok(self.store.ping().await?)
    }

    /// URL of the record's web view, returned to API callers
    pub fn status_url(&self, otp: &Otp) -> String {
        format!("{}/otp/{}/{}", self.config.root_url, otp.namespace, otp.id)
    }

    /// One-click verification URL embedded in messages
    pub fn check_url(&self, otp: &Otp) -> String {
        format!(
            "{}/otp/{}/{}?otp={}&action=check",
            self.config.root_url, otp.namespace, otp.id, otp.otp
        )
    }

    /// Render the provider's template and push it, bounded by the push timeout
    async fn push(&self, otp: &Otp, registered: &RegisteredProvider) -> DomainResult<()> {
        let provider = &registered.provider;
        let otp_url = self.check_url(otp);
        let message = registered.template.render(
            &PushContext {
                namespace: &otp.namespace,
                to: &otp.to,
                channel: provider.channel_name(),
                otp: &otp.otp,
                otp_url: &otp_url,
                ttl: otp.ttl,
            },
            provider.max_body_len(),
        );

        tracing::debug!(
            namespace = %otp.namespace,
            id = %otp.id,
            to = %mask_address(&otp.to),
            provider = provider.id(),
            "Sending OTP"
        );

        let result = tokio::time::timeout(
            self.config.push_timeout,
            provider.push(otp, &message.subject, &message.body),
        )
        .await;

        match result {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                tracing::error!(
                    namespace = %otp.namespace,
                    id = %otp.id,
                    provider = provider.id(),
                    error = %e,
                    event = "otp_push_failed",
                    "Error sending OTP"
                );
                Err(e.into())
            }
            Err(_) => {
                tracing::error!(
                    namespace = %otp.namespace,
                    id = %otp.id,
                    provider = provider.id(),
                    timeout_ms = self.config.push_timeout.as_millis() as u64,
                    event = "otp_push_timeout",
                    "Timed out sending OTP"
                );
                Err(ProviderError::Timeout.into())
            }
        }
    }

    fn validate_id(&self, id: &str) -> DomainResult<()> {
        if id.chars().count() < self.config.min_id_len {
            return Err(DomainError::invalid_input(
                "id",
                format!("should be min {} chars", self.config.min_id_len),
            ));
        }
        Ok(())
    }

    fn validate_address(&self, registered: &RegisteredProvider, to: &str) -> DomainResult<()> {
        let provider = &registered.provider;
        if to.chars().count() > provider.max_address_len() {
            return Err(DomainError::InvalidAddress(format!(
                "{} exceeds {} characters",
                provider.address_name(),
                provider.max_address_len()
            )));
        }
        provider.validate_address(to)?;
        Ok(())
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
