//! Shared utilities and common types for the OTP gateway
//!
//! This crate provides common functionality used across all crates:
//! - Configuration types and loading
//! - The HTTP response envelope
//! - Utility functions (address masking, random strings)

pub mod config;
pub mod types;
pub mod utils;

// Re-export commonly used items at crate root
pub use config::{
    AppConfig, AuthCredential, ConfigError, Environment, LogFormat, LoggingConfig, OtpConfig,
    ProviderConfig, ProviderKind, RedisConfig, ServerConfig, StoreConfig, StoreKind,
};
pub use types::{ApiResponse, ResponseStatus};
pub use utils::{mask, random};
