//! # Key Provider Abstraction
//!
//! Abstracts Ed25519 key storage and signing behind a trait, enabling
//! multiple backends:
//!
//! - [`LocalKeyProvider`]: in-memory key for development and testing, or
//!   built from a caller-supplied private key seed.
//! - [`EnvKeyProvider`]: loads key material from an environment variable
//!   (hex-encoded 32-byte Ed25519 seed). Suitable for container
//!   deployments where secrets are injected via environment.
//! - [`PromptKeyProvider`]: wraps another provider behind an
//!   [`ApprovalGate`] — each signing request is first presented to the
//!   gate, which may decline. A declined request surfaces as
//!   [`CryptoError::SigningDeclined`] and must not be retried. This is the
//!   seam for interactive wallet flows, whose UI lives outside this crate.
//!
//! ## Security Invariants
//!
//! - `KeyProvider` is `Send + Sync` for use across async tasks.
//! - Signing input is `&CanonicalBytes` (never raw bytes).
//! - Providers never expose seed material after construction.

use sigil_core::CanonicalBytes;

use crate::ed25519::{Ed25519KeyPair, Ed25519PublicKey, Ed25519Signature, SignerAddress};
use crate::error::CryptoError;

/// Trait for Ed25519 key storage and signing backends.
///
/// Implementations must be `Send + Sync` for use in multi-threaded async
/// runtimes. Signing input must be `&CanonicalBytes` to prevent signature
/// malleability from non-canonical serialization.
pub trait KeyProvider: Send + Sync {
    /// Sign canonicalized data with the managed Ed25519 key.
    fn sign(&self, data: &CanonicalBytes) -> Result<Ed25519Signature, CryptoError>;

    /// Return the Ed25519 verifying (public) key.
    fn public_key(&self) -> Result<Ed25519PublicKey, CryptoError>;

    /// Return the signer address derived from the public key.
    fn address(&self) -> Result<SignerAddress, CryptoError> {
        Ok(self.public_key()?.address())
    }

    /// Human-readable name for this provider (for diagnostics/logging).
    fn provider_name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// LocalKeyProvider
// ---------------------------------------------------------------------------

/// In-memory Ed25519 key provider.
///
/// Wraps an [`Ed25519KeyPair`] directly. Key material lives in process
/// memory for the provider's lifetime.
pub struct LocalKeyProvider {
    key: Ed25519KeyPair,
}

impl LocalKeyProvider {
    /// Create from an existing key pair.
    pub fn new(key: Ed25519KeyPair) -> Self {
        Self { key }
    }

    /// Generate a new random key using the OS CSPRNG.
    pub fn generate() -> Self {
        Self {
            key: Ed25519KeyPair::generate(),
        }
    }

    /// Create from a hex-encoded 32-byte seed.
    pub fn from_seed_hex(hex: &str) -> Result<Self, CryptoError> {
        Ok(Self {
            key: Ed25519KeyPair::from_seed_hex(hex)?,
        })
    }
}

impl KeyProvider for LocalKeyProvider {
    fn sign(&self, data: &CanonicalBytes) -> Result<Ed25519Signature, CryptoError> {
        Ok(self.key.sign(data))
    }

    fn public_key(&self) -> Result<Ed25519PublicKey, CryptoError> {
        Ok(self.key.public_key())
    }

    fn provider_name(&self) -> &str {
        "LocalKeyProvider"
    }
}

// ---------------------------------------------------------------------------
// EnvKeyProvider
// ---------------------------------------------------------------------------

/// Loads an Ed25519 signing key from an environment variable.
///
/// The variable must contain a 64-character hex string encoding the
/// 32-byte Ed25519 seed. The key is loaded once at construction.
///
/// ## Example
///
/// ```bash
/// export SIGIL_SIGNING_KEY="deadbeef..."  # 64 hex chars
/// ```
pub struct EnvKeyProvider {
    key: Ed25519KeyPair,
    var_name: String,
}

impl EnvKeyProvider {
    /// Load the signing key from the named environment variable.
    pub fn from_env(var_name: &str) -> Result<Self, CryptoError> {
        let hex = std::env::var(var_name).map_err(|_| {
            CryptoError::KeyError(format!("environment variable {var_name} not set"))
        })?;
        Ok(Self {
            key: Ed25519KeyPair::from_seed_hex(&hex)?,
            var_name: var_name.to_string(),
        })
    }

    /// The environment variable this provider was loaded from.
    pub fn var_name(&self) -> &str {
        &self.var_name
    }
}

impl KeyProvider for EnvKeyProvider {
    fn sign(&self, data: &CanonicalBytes) -> Result<Ed25519Signature, CryptoError> {
        Ok(self.key.sign(data))
    }

    fn public_key(&self) -> Result<Ed25519PublicKey, CryptoError> {
        Ok(self.key.public_key())
    }

    fn provider_name(&self) -> &str {
        "EnvKeyProvider"
    }
}

// ---------------------------------------------------------------------------
// PromptKeyProvider
// ---------------------------------------------------------------------------

/// Decision returned by an [`ApprovalGate`] for one signing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApprovalDecision {
    /// Sign the request.
    Approve,
    /// Decline with a reason (e.g. "user closed wallet prompt").
    Decline(String),
}

/// Gate consulted before each signing operation.
///
/// Interactive wallet UIs implement this trait outside the workspace;
/// tests use scripted gates.
pub trait ApprovalGate: Send + Sync {
    /// Decide whether the given canonical payload may be signed.
    fn review(&self, data: &CanonicalBytes) -> ApprovalDecision;
}

/// Key provider that asks an [`ApprovalGate`] before every signature.
///
/// Models interactive wallets: the underlying key signs only if the gate
/// approves. A declined request returns
/// [`CryptoError::SigningDeclined`] — terminal, never retried.
pub struct PromptKeyProvider<P> {
    inner: P,
    gate: Box<dyn ApprovalGate>,
}

impl<P: KeyProvider> PromptKeyProvider<P> {
    /// Wrap a provider behind an approval gate.
    pub fn new(inner: P, gate: Box<dyn ApprovalGate>) -> Self {
        Self { inner, gate }
    }
}

impl<P: KeyProvider> KeyProvider for PromptKeyProvider<P> {
    fn sign(&self, data: &CanonicalBytes) -> Result<Ed25519Signature, CryptoError> {
        match self.gate.review(data) {
            ApprovalDecision::Approve => self.inner.sign(data),
            ApprovalDecision::Decline(reason) => {
                tracing::warn!(reason = %reason, "signing request declined by approval gate");
                Err(CryptoError::SigningDeclined(reason))
            }
        }
    }

    fn public_key(&self) -> Result<Ed25519PublicKey, CryptoError> {
        self.inner.public_key()
    }

    fn provider_name(&self) -> &str {
        "PromptKeyProvider"
    }
}
