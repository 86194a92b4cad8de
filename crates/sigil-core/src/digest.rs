//! # Content Digest — Content-Addressed Identifiers
//!
//! Defines `ContentDigest`, the 32-byte SHA-256 identifier used for capture
//! envelopes, chain links, and anchor commitments throughout the Sigil Stack.
//!
//! ## Security Invariant
//!
//! `ContentDigest` values can only be computed from `CanonicalBytes`, so all
//! digests in the system are produced through the canonicalization pipeline.
//! This is enforced by the signature of [`sha256_digest()`].
//!
//! ## Wire Format
//!
//! Digests serialize as 64-character lowercase hex strings. The all-zero
//! digest (`ContentDigest::zero()`) is reserved as the genesis sentinel that
//! seeds every signing chain.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

use crate::canonical::CanonicalBytes;
use crate::error::CoreError;

/// A 32-byte SHA-256 content digest.
///
/// Produced exclusively from `CanonicalBytes` via [`sha256_digest()`].
/// Serializes as a 64-character lowercase hex string for JSON
/// interoperability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentDigest([u8; 32]);

impl ContentDigest {
    /// The all-zero digest, used as the genesis sentinel for hash chains.
    pub const fn zero() -> Self {
        Self([0u8; 32])
    }

    /// Returns true if this is the all-zero genesis sentinel.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// Create a digest from raw 32 bytes.
    ///
    /// Prefer [`sha256_digest()`] for computing digests from data.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Return the raw 32-byte digest value.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Render the digest as a lowercase hex string.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }

    /// Parse a digest from a 64-character hex string.
    pub fn from_hex(hex: &str) -> Result<Self, CoreError> {
        let hex = hex.trim().to_lowercase();
        if hex.len() != 64 {
            return Err(CoreError::Validation(format!(
                "digest hex must be 64 chars, got {}",
                hex.len()
            )));
        }
        let mut bytes = [0u8; 32];
        for (i, chunk) in hex.as_bytes().chunks(2).enumerate() {
            let s = std::str::from_utf8(chunk)
                .map_err(|e| CoreError::Validation(format!("invalid digest hex: {e}")))?;
            bytes[i] = u8::from_str_radix(s, 16)
                .map_err(|e| CoreError::Validation(format!("invalid digest hex: {e}")))?;
        }
        Ok(Self(bytes))
    }
}

impl Serialize for ContentDigest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ContentDigest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let hex = String::deserialize(deserializer)?;
        Self::from_hex(&hex).map_err(serde::de::Error::custom)
    }
}

impl std::fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Compute a SHA-256 content digest from canonical bytes.
///
/// This is the single digest-computation path in the workspace. The function
/// signature accepts only `&CanonicalBytes`, not raw `&[u8]` — a compile-time
/// constraint that prevents any code path from hashing non-canonical bytes.
pub fn sha256_digest(data: &CanonicalBytes) -> ContentDigest {
    let hash = Sha256::digest(data.as_bytes());
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&hash);
    ContentDigest(bytes)
}

/// Compute a SHA-256 hex string from canonical bytes.
///
/// Convenience wrapper around [`sha256_digest()`] for contexts that need the
/// digest as a hex string (e.g. pointer construction).
pub fn sha256_hex(data: &CanonicalBytes) -> String {
    sha256_digest(data).to_hex()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_deterministic() {
        let cb = CanonicalBytes::new(&serde_json::json!({"a": 1, "b": 2})).unwrap();
        assert_eq!(sha256_digest(&cb), sha256_digest(&cb));
    }

    #[test]
    fn hex_format() {
        let cb = CanonicalBytes::new(&serde_json::json!({"key": "value"})).unwrap();
        let hex = sha256_hex(&cb);
        assert_eq!(hex.len(), 64);
        assert!(hex.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn different_inputs_different_digests() {
        let c1 = CanonicalBytes::new(&serde_json::json!({"a": 1})).unwrap();
        let c2 = CanonicalBytes::new(&serde_json::json!({"a": 2})).unwrap();
        assert_ne!(sha256_digest(&c1), sha256_digest(&c2));
    }

    #[test]
    fn known_sha256_vector() {
        // SHA256("{}") — verified against Python hashlib.sha256(b"{}").hexdigest()
        let cb = CanonicalBytes::new(&serde_json::json!({})).unwrap();
        assert_eq!(cb.as_bytes(), b"{}");
        assert_eq!(
            sha256_digest(&cb).to_hex(),
            "44136fa355b3678a1146ad16f7e8649e94fb4fc21fe77e8310c060f61caaff8a"
        );
    }

    #[test]
    fn zero_digest_sentinel() {
        let zero = ContentDigest::zero();
        assert!(zero.is_zero());
        assert_eq!(zero.to_hex(), "00".repeat(32));
        let cb = CanonicalBytes::new(&serde_json::json!({})).unwrap();
        assert!(!sha256_digest(&cb).is_zero());
    }

    #[test]
    fn hex_roundtrip() {
        let cb = CanonicalBytes::new(&serde_json::json!({"x": true})).unwrap();
        let digest = sha256_digest(&cb);
        let parsed = ContentDigest::from_hex(&digest.to_hex()).unwrap();
        assert_eq!(digest, parsed);
    }

    #[test]
    fn from_hex_rejects_bad_input() {
        assert!(ContentDigest::from_hex("").is_err());
        assert!(ContentDigest::from_hex("abc").is_err());
        assert!(ContentDigest::from_hex(&"zz".repeat(32)).is_err());
    }

    #[test]
    fn serde_as_hex_string() {
        let digest = ContentDigest::zero();
        let json = serde_json::to_string(&digest).unwrap();
        assert_eq!(json, format!("\"{}\"", "00".repeat(32)));
        let back: ContentDigest = serde_json::from_str(&json).unwrap();
        assert_eq!(back, digest);
    }
}
