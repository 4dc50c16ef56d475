//! Stable content hashing for XML subtrees, byte arrays, and comparison units.
//!
//! Every comparison unit across the WML/SML/PML engines exposes a `hash`
//! produced here so the generic [`crate::diff::lcs`] kernel can stay blind to
//! unit kind. SHA-256 gives negligible collision probability and is
//! deterministic across runs and platforms, matching the determinism
//! invariant in the concurrency model.

use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 digest of a string.
pub fn hash_string(s: &str) -> String {
    hash_bytes(s.as_bytes())
}

/// Hex-encoded SHA-256 digest of a byte slice.
pub fn hash_bytes(b: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(b);
    hex_encode(&hasher.finalize())
}

/// 16-hex-character short-form id derived from a string's content hash.
///
/// Used for revision-adjacent identifiers where a full 64-character digest
/// would be unwieldy but stability across runs still matters.
pub fn content_id(s: &str) -> String {
    let full = hash_string(s);
    full[..16].to_string()
}

/// Combine several already-hashed components into one hash, preserving order.
///
/// Used by composite comparison units (e.g. a slide signature combining its
/// shape signatures) so that a change in any component changes the whole.
pub fn combine<'a, I: IntoIterator<Item = &'a str>>(parts: I) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.as_bytes());
        hasher.update([0u8]); // separator, prevents "ab"+"c" colliding with "a"+"bc"
    }
    hex_encode(&hasher.finalize())
}

fn hex_encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push_str(&format!("{:02x}", b));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_across_calls() {
        assert_eq!(hash_string("hello"), hash_string("hello"));
        assert_ne!(hash_string("hello"), hash_string("world"));
    }

    #[test]
    fn content_id_is_16_hex_chars() {
        let id = content_id("the quick brown fox");
        assert_eq!(id.len(), 16);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn combine_is_order_sensitive_and_unambiguous() {
        let a = combine(["ab", "c"]);
        let b = combine(["a", "bc"]);
        assert_ne!(a, b);
        assert_eq!(combine(["x", "y"]), combine(["x", "y"]));
    }
}
