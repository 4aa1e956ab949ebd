//! Cache module for Redis-based OTP storage
//!
//! Provides the Redis connection wrapper and the `OtpStore` implementation
//! built on it.

pub mod otp_store;
pub mod publisher;
pub mod redis_client;

pub use otp_store::RedisOtpStore;
pub use publisher::EventPublisher;
pub use redis_client::RedisClient;
