//! Prefixed identifiers
//!
//! Entity ids look like `usr_3q2-7wEi1vZ9kQ0a` so their kind is visible in
//! logs and URLs. The random part carries 96 bits from the OS generator and is
//! URL-safe base64 without padding.

use base64::{Engine, prelude::BASE64_URL_SAFE_NO_PAD};
use rand::{TryRngCore, rngs::OsRng};

const ID_ENTROPY_BYTES: usize = 12;

/// Generate `{prefix}_{random}` with 96 bits of entropy.
///
/// # Panics
///
/// Panics if the OS random source is unavailable.
pub fn generate_prefixed_id(prefix: &str) -> String {
    let mut bytes = [0u8; ID_ENTROPY_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .expect("OS RNG failure - system entropy source unavailable");

    format!("{prefix}_{}", BASE64_URL_SAFE_NO_PAD.encode(bytes))
}

/// Check that `id` carries `expected_prefix` and a decodable random part of
/// at least 96 bits.
pub fn validate_prefixed_id(id: &str, expected_prefix: &str) -> bool {
    let Some(random_part) = id
        .strip_prefix(expected_prefix)
        .and_then(|rest| rest.strip_prefix('_'))
    else {
        return false;
    };

    BASE64_URL_SAFE_NO_PAD
        .decode(random_part)
        .is_ok_and(|decoded| decoded.len() >= ID_ENTROPY_BYTES)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_prefixed_id() {
        let id = generate_prefixed_id("usr");
        assert!(id.starts_with("usr_"));
        assert_ne!(id, generate_prefixed_id("usr"));
    }

    #[test]
    fn test_validate_prefixed_id() {
        let id = generate_prefixed_id("rtk");
        assert!(validate_prefixed_id(&id, "rtk"));
        assert!(!validate_prefixed_id(&id, "usr"));

        assert!(!validate_prefixed_id("rtk", "rtk"));
        assert!(!validate_prefixed_id("rtk_", "rtk"));
        assert!(!validate_prefixed_id("rtk_not*base64", "rtk"));
        assert!(!validate_prefixed_id("rtkx_AAAAAAAAAAAAAAAA", "rtk"));
    }

    #[test]
    fn test_id_is_url_safe() {
        let id = generate_prefixed_id("usr");
        assert!(
            id.chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        );
    }
}
