//! Domain entities representing core business objects.

pub mod otp;

pub use otp::{AttemptInfo, Otp, OtpState, DEFAULT_EXTRA, GENERATED_ID_LEN, MAX_TTL, MIN_ID_LEN};
