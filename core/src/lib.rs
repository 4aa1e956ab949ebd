//! # OTP Gateway Core
//!
//! Core domain layer of the OTP gateway: the OTP record, the store
//! contract and its in-memory implementation, the channel provider
//! contract, and the verification state machine that ties them together.

pub mod domain;
pub mod errors;
pub mod repositories;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::*;
pub use errors::*;
pub use repositories::*;
pub use services::*;
