//! Verification service module
//!
//! This module provides the OTP workflow:
//! - Issuance with lock-aware re-issue
//! - Verification with attempt counting and locking
//! - Address collection and (re)delivery through channel providers
//! - Message rendering and the provider registry

mod config;
mod registry;
mod render;
mod service;
mod traits;
mod types;

#[cfg(test)]
mod tests;

pub use config::VerificationServiceConfig;
pub use registry::{ProviderRegistry, RegisteredProvider};
pub use render::{MessageTemplate, PushContext, RenderedMessage, DEFAULT_BODY};
pub use service::VerificationService;
pub use traits::Provider;
pub use types::{AddressOutcome, IssueRequest, IssuedOtp};
