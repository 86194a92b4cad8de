//! Error types for chain construction, verification, and storage.

use sigil_core::CanonicalizationError;
use sigil_crypto::CryptoError;
use thiserror::Error;

use crate::status::AnchorState;

/// Errors from signing, verification, and the record store.
#[derive(Error, Debug)]
pub enum ChainError {
    /// Entry or commitment could not be canonicalized for hashing.
    #[error("canonicalization error: {0}")]
    Canonicalization(#[from] CanonicalizationError),

    /// Signing or verification failed at the crypto layer.
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// Chain verification found a break.
    #[error("chain integrity violation at record {index}: {reason}")]
    IntegrityViolation { index: usize, reason: String },

    /// A record with this entry hash already exists in the store.
    #[error("duplicate record: {0}")]
    DuplicateRecord(String),

    /// No record with this entry hash exists in the store.
    #[error("unknown record: {0}")]
    UnknownRecord(String),

    /// The requested anchor status transition is not allowed.
    #[error("invalid status transition: {from:?} -> {to:?}")]
    InvalidTransition { from: AnchorState, to: AnchorState },

    /// The store has been closed.
    #[error("record store is closed")]
    StoreClosed,
}

impl ChainError {
    /// Whether this error came from explicit chain verification.
    pub fn is_integrity_violation(&self) -> bool {
        matches!(self, Self::IntegrityViolation { .. })
    }
}
