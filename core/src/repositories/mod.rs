pub mod otp;

pub use otp::{record_key, InMemoryOtpStore, OtpStore};
