//! Cryptographically random strings

use rand::{rngs::OsRng, Rng};

/// Characters used for generated record ids
pub const ALPHANUMERIC: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Characters used for generated OTPs
pub const NUMERIC: &[u8] = b"0123456789";

/// Generate a string of `len` characters drawn uniformly from `charset` using the OS RNG
pub fn random_string(len: usize, charset: &[u8]) -> String {
    if charset.is_empty() {
        return String::new();
    }
    let mut rng = OsRng;
    (0..len)
        .map(|_| charset[rng.gen_range(0..charset.len())] as char)
        .collect()
}
