//! Type definitions shared across crates
//!
//! - `response` - HTTP response envelope

pub mod response;

pub use response::{ApiResponse, ResponseStatus};
