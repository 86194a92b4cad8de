//! # Ed25519 Signing and Verification
//!
//! Provides Ed25519 key generation, signing, and verification for
//! chain-linked call records.
//!
//! ## Security Invariant
//!
//! - Signing input MUST be `&CanonicalBytes` — you cannot sign raw bytes.
//!   This enforces that all signed data has been canonicalized through the
//!   JCS pipeline, preventing the canonicalization split defect.
//! - Private keys are never serialized or logged. `Ed25519KeyPair` does
//!   not implement `Serialize` or expose the private key bytes.
//!
//! ## Signer Addresses
//!
//! Ed25519 signatures do not support public-key recovery, so a signed
//! record carries its signer identity explicitly as a [`SignerAddress`]:
//! the hex-encoded 32-byte verifying key. Verification parses the stored
//! address back into a verifying key — tampering with the address, the
//! signature, or the signed bytes all surface as verification failure.
//!
//! ## Serde
//!
//! Public keys, addresses, and signatures serialize as hex-encoded strings.

use ed25519_dalek::{Signer, Verifier};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sigil_core::CanonicalBytes;

use crate::error::CryptoError;

/// An Ed25519 public key (32 bytes) for signature verification.
///
/// Serializes as a hex-encoded string for JSON interoperability.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Ed25519PublicKey(pub [u8; 32]);

/// An Ed25519 signature (64 bytes). Serializes as a hex-encoded string.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Ed25519Signature(pub [u8; 64]);

/// An Ed25519 key pair for signing operations.
///
/// Does not implement `Serialize` — private keys must not be accidentally
/// serialized into logs, responses, or artifacts.
pub struct Ed25519KeyPair {
    signing_key: ed25519_dalek::SigningKey,
}

/// The stable signer identity carried by every signed record: the
/// hex-encoded Ed25519 verifying key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SignerAddress(String);

// ---------------------------------------------------------------------------
// Ed25519PublicKey impls
// ---------------------------------------------------------------------------

impl Ed25519PublicKey {
    /// Create a public key from raw 32 bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Return the raw 32-byte public key.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Render the public key as a lowercase hex string.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }

    /// Parse a public key from a 64-character hex string.
    pub fn from_hex(hex: &str) -> Result<Self, CryptoError> {
        let hex = hex.trim().to_lowercase();
        if hex.len() != 64 {
            return Err(CryptoError::KeyError(format!(
                "public key hex must be 64 chars, got {}",
                hex.len()
            )));
        }
        let bytes = hex_to_bytes(&hex).map_err(CryptoError::HexDecode)?;
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }

    /// The signer address for this public key.
    pub fn address(&self) -> SignerAddress {
        SignerAddress(self.to_hex())
    }

    /// Convert to an `ed25519_dalek::VerifyingKey` for verification.
    pub fn to_verifying_key(&self) -> Result<ed25519_dalek::VerifyingKey, CryptoError> {
        ed25519_dalek::VerifyingKey::from_bytes(&self.0)
            .map_err(|e| CryptoError::KeyError(format!("invalid public key: {e}")))
    }
}

impl Serialize for Ed25519PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Ed25519PublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let hex = String::deserialize(deserializer)?;
        Self::from_hex(&hex).map_err(serde::de::Error::custom)
    }
}

impl std::fmt::Debug for Ed25519PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Ed25519PublicKey({}...)", hex_prefix(&self.0))
    }
}

impl std::fmt::Display for Ed25519PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

// ---------------------------------------------------------------------------
// Ed25519Signature impls
// ---------------------------------------------------------------------------

impl Ed25519Signature {
    /// Create a signature from raw 64 bytes.
    pub fn from_bytes(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    /// Return the raw 64-byte signature.
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }

    /// Render the signature as a lowercase hex string.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }

    /// Parse a signature from a 128-character hex string.
    pub fn from_hex(hex: &str) -> Result<Self, CryptoError> {
        let hex = hex.trim().to_lowercase();
        if hex.len() != 128 {
            return Err(CryptoError::VerificationFailed(format!(
                "signature hex must be 128 chars, got {}",
                hex.len()
            )));
        }
        let bytes = hex_to_bytes(&hex).map_err(CryptoError::HexDecode)?;
        let mut arr = [0u8; 64];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl Serialize for Ed25519Signature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Ed25519Signature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let hex = String::deserialize(deserializer)?;
        Self::from_hex(&hex).map_err(serde::de::Error::custom)
    }
}

impl std::fmt::Debug for Ed25519Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Ed25519Signature({}...)", hex_prefix(&self.0))
    }
}

impl std::fmt::Display for Ed25519Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

// ---------------------------------------------------------------------------
// SignerAddress impls
// ---------------------------------------------------------------------------

impl SignerAddress {
    /// Parse and validate an address (64 lowercase hex chars).
    pub fn parse(s: &str) -> Result<Self, CryptoError> {
        // Delegates validation to the public-key parser.
        Ok(Ed25519PublicKey::from_hex(s)?.address())
    }

    /// The address as a hex string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Recover the verifying key this address encodes.
    pub fn to_verifying_key(&self) -> Result<ed25519_dalek::VerifyingKey, CryptoError> {
        Ed25519PublicKey::from_hex(&self.0)?.to_verifying_key()
    }
}

impl std::fmt::Display for SignerAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Ed25519KeyPair impls
// ---------------------------------------------------------------------------

impl Ed25519KeyPair {
    /// Generate a new random Ed25519 key pair.
    pub fn generate() -> Self {
        let mut csprng = rand::rngs::OsRng;
        let signing_key = ed25519_dalek::SigningKey::generate(&mut csprng);
        Self { signing_key }
    }

    /// Create a key pair from a raw 32-byte private key seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: ed25519_dalek::SigningKey::from_bytes(seed),
        }
    }

    /// Create a key pair from a 64-character hex seed string.
    pub fn from_seed_hex(hex: &str) -> Result<Self, CryptoError> {
        let hex = hex.trim().trim_start_matches("0x").to_lowercase();
        if hex.len() != 64 {
            return Err(CryptoError::KeyError(format!(
                "seed hex must be 64 chars, got {}",
                hex.len()
            )));
        }
        let bytes = hex_to_bytes(&hex).map_err(CryptoError::HexDecode)?;
        let mut seed = [0u8; 32];
        seed.copy_from_slice(&bytes);
        Ok(Self::from_seed(&seed))
    }

    /// Get the public key from this key pair.
    pub fn public_key(&self) -> Ed25519PublicKey {
        Ed25519PublicKey(self.signing_key.verifying_key().to_bytes())
    }

    /// Sign canonical bytes.
    ///
    /// The signing input MUST be `&CanonicalBytes` to enforce that all
    /// signed data has been canonicalized through the JCS pipeline.
    pub fn sign(&self, data: &CanonicalBytes) -> Ed25519Signature {
        let sig = self.signing_key.sign(data.as_bytes());
        Ed25519Signature(sig.to_bytes())
    }
}

impl std::fmt::Debug for Ed25519KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Ed25519KeyPair(<private>)")
    }
}

// ---------------------------------------------------------------------------
// Verification
// ---------------------------------------------------------------------------

/// Verify an Ed25519 signature over canonical bytes.
///
/// The message parameter is `&CanonicalBytes`, enforcing at compile time
/// that only canonicalized data can be verified.
pub fn verify(
    data: &CanonicalBytes,
    signature: &Ed25519Signature,
    verifying_key: &ed25519_dalek::VerifyingKey,
) -> Result<(), CryptoError> {
    let sig = ed25519_dalek::Signature::from_bytes(&signature.0);
    verifying_key
        .verify(data.as_bytes(), &sig)
        .map_err(|e| CryptoError::VerificationFailed(format!("Ed25519 verification failed: {e}")))
}

/// Verify a signature against the signer address stored in a record.
///
/// Parses the address back into a verifying key and delegates to
/// [`verify()`]. A malformed address is a verification failure, not a
/// distinct error class — the record is not attributable either way.
pub fn verify_with_address(
    data: &CanonicalBytes,
    signature: &Ed25519Signature,
    address: &SignerAddress,
) -> Result<(), CryptoError> {
    let vk = address.to_verifying_key()?;
    verify(data, signature, &vk)
}

// ---------------------------------------------------------------------------
// Hex utilities (no external hex crate dependency)
// ---------------------------------------------------------------------------

fn hex_prefix(bytes: &[u8]) -> String {
    bytes.iter().take(4).map(|b| format!("{b:02x}")).collect()
}

fn hex_to_bytes(hex: &str) -> Result<Vec<u8>, String> {
    if hex.len() % 2 != 0 {
        return Err("hex string must have even length".to_string());
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&hex[i..i + 2], 16)
                .map_err(|e| format!("invalid hex at position {i}: {e}"))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keypair_generation() {
        let kp = Ed25519KeyPair::generate();
        assert_eq!(kp.public_key().as_bytes().len(), 32);
    }

    #[test]
    fn sign_and_verify() {
        let kp = Ed25519KeyPair::generate();
        let canonical =
            CanonicalBytes::new(&serde_json::json!({"message": "hello", "nonce": 42})).unwrap();
        let sig = kp.sign(&canonical);
        assert_eq!(sig.as_bytes().len(), 64);

        let vk = kp.public_key().to_verifying_key().unwrap();
        verify(&canonical, &sig, &vk).expect("valid signature should verify");
    }

    #[test]
    fn verify_wrong_key_fails() {
        let kp1 = Ed25519KeyPair::generate();
        let kp2 = Ed25519KeyPair::generate();
        let canonical = CanonicalBytes::new(&serde_json::json!({"test": true})).unwrap();
        let sig = kp1.sign(&canonical);

        let wrong_vk = kp2.public_key().to_verifying_key().unwrap();
        assert!(verify(&canonical, &sig, &wrong_vk).is_err());
    }

    #[test]
    fn verify_wrong_message_fails() {
        let kp = Ed25519KeyPair::generate();
        let c1 = CanonicalBytes::new(&serde_json::json!({"msg": "original"})).unwrap();
        let c2 = CanonicalBytes::new(&serde_json::json!({"msg": "tampered"})).unwrap();
        let sig = kp.sign(&c1);

        let vk = kp.public_key().to_verifying_key().unwrap();
        assert!(verify(&c2, &sig, &vk).is_err());
    }

    #[test]
    fn verify_with_address_roundtrip() {
        let kp = Ed25519KeyPair::generate();
        let canonical = CanonicalBytes::new(&serde_json::json!({"call": "greet"})).unwrap();
        let sig = kp.sign(&canonical);
        let address = kp.public_key().address();

        verify_with_address(&canonical, &sig, &address).expect("should verify");
    }

    #[test]
    fn verify_with_foreign_address_fails() {
        let kp = Ed25519KeyPair::generate();
        let other = Ed25519KeyPair::generate();
        let canonical = CanonicalBytes::new(&serde_json::json!({"call": "greet"})).unwrap();
        let sig = kp.sign(&canonical);

        let result = verify_with_address(&canonical, &sig, &other.public_key().address());
        assert!(result.is_err());
    }

    #[test]
    fn deterministic_from_seed() {
        let seed = [42u8; 32];
        let kp1 = Ed25519KeyPair::from_seed(&seed);
        let kp2 = Ed25519KeyPair::from_seed(&seed);
        assert_eq!(kp1.public_key(), kp2.public_key());

        let canonical = CanonicalBytes::new(&serde_json::json!({"test": "det"})).unwrap();
        assert_eq!(kp1.sign(&canonical), kp2.sign(&canonical));
    }

    #[test]
    fn from_seed_hex_accepts_0x_prefix() {
        let hex = "2a".repeat(32);
        let kp1 = Ed25519KeyPair::from_seed_hex(&hex).unwrap();
        let kp2 = Ed25519KeyPair::from_seed_hex(&format!("0x{hex}")).unwrap();
        assert_eq!(kp1.public_key(), kp2.public_key());
    }

    #[test]
    fn from_seed_hex_rejects_bad_input() {
        assert!(Ed25519KeyPair::from_seed_hex("abc").is_err());
        assert!(Ed25519KeyPair::from_seed_hex(&"zz".repeat(32)).is_err());
    }

    #[test]
    fn address_parse_roundtrip() {
        let kp = Ed25519KeyPair::generate();
        let address = kp.public_key().address();
        let parsed = SignerAddress::parse(address.as_str()).unwrap();
        assert_eq!(address, parsed);
    }

    #[test]
    fn address_serde_transparent() {
        let kp = Ed25519KeyPair::generate();
        let address = kp.public_key().address();
        let json = serde_json::to_string(&address).unwrap();
        assert_eq!(json.len(), 64 + 2); // hex + quotes
        let back: SignerAddress = serde_json::from_str(&json).unwrap();
        assert_eq!(address, back);
    }

    #[test]
    fn signature_hex_roundtrip() {
        let kp = Ed25519KeyPair::generate();
        let canonical = CanonicalBytes::new(&serde_json::json!({"x": 1})).unwrap();
        let sig = kp.sign(&canonical);
        let sig2 = Ed25519Signature::from_hex(&sig.to_hex()).unwrap();
        assert_eq!(sig, sig2);
    }

    #[test]
    fn debug_does_not_leak_private_key() {
        let kp = Ed25519KeyPair::generate();
        let debug = format!("{kp:?}");
        assert_eq!(debug, "Ed25519KeyPair(<private>)");
        assert!(!debug.contains("SigningKey"));
    }
}
