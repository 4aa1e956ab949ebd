//! Business services containing domain logic and use cases.

pub mod verification;

// Re-export commonly used types
pub use verification::{
    AddressOutcome, IssueRequest, IssuedOtp, MessageTemplate, Provider, ProviderRegistry,
    RegisteredProvider, VerificationService, VerificationServiceConfig,
};
