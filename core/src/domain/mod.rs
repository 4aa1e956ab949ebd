//! Domain layer containing the OTP record and store events.

pub mod entities;
pub mod events;

// Re-export commonly used domain types
pub use entities::{AttemptInfo, Otp, OtpState, DEFAULT_EXTRA, GENERATED_ID_LEN, MAX_TTL, MIN_ID_LEN};
pub use events::{OtpEvent, OtpEventKind};
