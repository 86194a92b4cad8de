//! # Canonical Serialization — JCS-Compatible Byte Production
//!
//! This module defines `CanonicalBytes`, the sole construction path for bytes
//! used in digest computation across the entire Sigil Stack.
//!
//! ## Security Invariant
//!
//! The `CanonicalBytes` newtype has a private inner field. The only way to
//! construct one is through `CanonicalBytes::new()` (or `from_value()`),
//! which serializes through RFC 8785 (JSON Canonicalization Scheme): sorted
//! object keys, compact separators, ES6 number formatting, deterministic
//! byte sequence.
//!
//! This makes the "wrong serialization path" defect class structurally
//! impossible: any function requiring canonical bytes for digest computation
//! must accept `&CanonicalBytes`, and the only way to produce one is through
//! the correct pipeline.
//!
//! ## Floats
//!
//! Capture envelopes hash arbitrary caller-supplied argument and result
//! values, so finite floats are accepted and serialized with the ES6
//! shortest-round-trip rules from RFC 8785. Non-finite floats (`NaN`,
//! `±Inf`) cannot be represented in JSON; `serde_json` maps them to `null`
//! at the value-tree boundary, which keeps the byte sequence deterministic.

use serde::Serialize;
use serde_json::Value;

use crate::error::CanonicalizationError;

/// Bytes produced exclusively by RFC 8785 JCS canonicalization.
///
/// # Invariants
///
/// - The only constructors are `CanonicalBytes::new()` and
///   `CanonicalBytes::from_value()`.
/// - Object keys are sorted lexicographically by UTF-16 code units.
/// - Separators are compact; output is UTF-8 with no trailing whitespace.
///
/// These invariants are enforced by the constructors and cannot be violated
/// by downstream code because the inner `Vec<u8>` is private.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalBytes(Vec<u8>);

impl CanonicalBytes {
    /// Construct canonical bytes from any serializable value.
    ///
    /// This is the ONLY way to produce bytes for digest computation or
    /// signing. All hash and signature paths in the entire stack must flow
    /// through this constructor.
    ///
    /// # Errors
    ///
    /// Returns `CanonicalizationError::SerializationFailed` if the value
    /// cannot be represented as JSON or JCS serialization fails.
    pub fn new(obj: &impl Serialize) -> Result<Self, CanonicalizationError> {
        let value = serde_json::to_value(obj)?;
        Self::from_value(value)
    }

    /// Construct canonical bytes from an already-built JSON value tree.
    ///
    /// Useful when the caller needs to strip or normalize fields (e.g.
    /// removing a signature before recomputing a commitment) before
    /// canonicalization.
    pub fn from_value(value: Value) -> Result<Self, CanonicalizationError> {
        let s = serde_jcs::to_string(&value)?;
        Ok(Self(s.into_bytes()))
    }

    /// Access the canonical bytes for digest computation.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns the length of the canonical byte sequence.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the canonical byte sequence is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for CanonicalBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_object_sorted_compact() {
        let data = serde_json::json!({"b": 2, "a": 1, "c": "hello"});
        let cb = CanonicalBytes::new(&data).expect("should canonicalize");
        let s = std::str::from_utf8(cb.as_bytes()).unwrap();
        assert_eq!(s, r#"{"a":1,"b":2,"c":"hello"}"#);
    }

    #[test]
    fn nested_objects_sorted() {
        let data = serde_json::json!({
            "outer": {"b": 2, "a": 1},
            "list": [3, 2, 1]
        });
        let cb = CanonicalBytes::new(&data).expect("should canonicalize");
        let s = std::str::from_utf8(cb.as_bytes()).unwrap();
        assert_eq!(s, r#"{"list":[3,2,1],"outer":{"a":1,"b":2}}"#);
    }

    #[test]
    fn finite_floats_accepted() {
        let data = serde_json::json!({"score": 0.5});
        let cb = CanonicalBytes::new(&data).expect("finite floats canonicalize");
        let s = std::str::from_utf8(cb.as_bytes()).unwrap();
        assert_eq!(s, r#"{"score":0.5}"#);
    }

    #[test]
    fn integers_have_no_fraction() {
        let data = serde_json::json!({"amount": 42});
        let cb = CanonicalBytes::new(&data).unwrap();
        assert_eq!(cb.as_bytes(), br#"{"amount":42}"#);
    }

    #[test]
    fn null_passthrough() {
        let data = serde_json::json!({"key": null});
        let cb = CanonicalBytes::new(&data).unwrap();
        assert_eq!(cb.as_bytes(), br#"{"key":null}"#);
    }

    #[test]
    fn empty_object_and_array() {
        assert_eq!(
            CanonicalBytes::new(&serde_json::json!({})).unwrap().as_bytes(),
            b"{}"
        );
        assert_eq!(
            CanonicalBytes::new(&serde_json::json!([])).unwrap().as_bytes(),
            b"[]"
        );
    }

    #[test]
    fn unicode_passthrough() {
        // JCS does not ASCII-escape; non-ASCII chars pass through as UTF-8.
        let data = serde_json::json!({"name": "\u{00e9}\u{00e8}\u{00ea}"});
        let cb = CanonicalBytes::new(&data).unwrap();
        let s = std::str::from_utf8(cb.as_bytes()).unwrap();
        assert!(s.contains('\u{00e9}'));
    }

    #[test]
    fn from_value_matches_new() {
        let data = serde_json::json!({"z": 1, "a": [true, null]});
        let a = CanonicalBytes::new(&data).unwrap();
        let b = CanonicalBytes::from_value(data).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn len_and_is_empty() {
        let cb = CanonicalBytes::new(&serde_json::json!({"a": 1})).unwrap();
        assert!(!cb.is_empty());
        assert!(cb.len() > 0);
    }
}
