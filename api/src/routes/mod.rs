//! Route handlers
//!
//! - `otp`: authenticated issuance, verification and status API
//! - `system`: index, provider list and health check
//! - `views`: browser pages for address collection and OTP entry

pub mod otp;
pub mod system;
pub mod views;
