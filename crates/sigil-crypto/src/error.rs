//! # Cryptographic Error Types
//!
//! Structured errors for all cryptographic operations in `sigil-crypto`.
//! Uses `thiserror` for ergonomic error definitions with diagnostic context.

use thiserror::Error;

/// Errors from cryptographic operations in the Sigil Stack.
#[derive(Error, Debug)]
pub enum CryptoError {
    /// Ed25519 signature verification failed.
    #[error("Ed25519 verification failed: {0}")]
    VerificationFailed(String),

    /// Key generation, parsing, or loading failed.
    #[error("key error: {0}")]
    KeyError(String),

    /// The signer (interactive wallet / approval gate) declined to sign.
    ///
    /// Terminal for the operation that requested the signature: callers
    /// must not retry a declined signing request.
    #[error("signing declined by signer: {0}")]
    SigningDeclined(String),

    /// Hex decoding error.
    #[error("hex decode error: {0}")]
    HexDecode(String),
}

impl CryptoError {
    /// Whether this error is a user/signer rejection (never retryable).
    pub fn is_declined(&self) -> bool {
        matches!(self, Self::SigningDeclined(_))
    }
}
