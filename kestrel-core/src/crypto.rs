//! Token generation and hashing
//!
//! Refresh token identifiers and password reset tokens are 256-bit random
//! values. Reset tokens are persisted only as SHA-256 digests so a leaked
//! table cannot be replayed.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::{TryRngCore, rngs::OsRng};
use sha2::{Digest, Sha256};

/// Generate a URL-safe random token with 256 bits of entropy (43 characters).
///
/// # Panics
///
/// Panics if the OS random source is unavailable.
pub fn generate_secure_token() -> String {
    let mut bytes = [0u8; 32];
    OsRng
        .try_fill_bytes(&mut bytes)
        .expect("OS RNG failure - system entropy source unavailable");
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Hex-encoded SHA-256 of `token`, used as the lookup key for stored tokens.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}
