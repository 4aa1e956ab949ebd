//! Common utility functions

pub mod mask;
pub mod random;

// Re-export commonly used utilities
pub use mask::*;
pub use random::*;
