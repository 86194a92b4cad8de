//! Top-level witness errors.
//!
//! Severity taxonomy:
//!
//! - Configuration errors are fatal at wrap time; no witness is built.
//! - Signing errors are fatal per call; the chain and store are left
//!   untouched and the caller sees the error.
//! - Anchor errors surface to the caller only in sync mode; the other
//!   modes report them via callbacks and status queries.
//! - Target errors are the wrapped object's own failures, passed
//!   through after capture.

use sigil_anchor::AnchorError;
use sigil_chain::{AnchorState, ChainError, ErrorInfo};
use sigil_core::CoreError;
use sigil_crypto::CryptoError;
use sigil_redact::RedactionError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WitnessError {
    /// Invalid runtime configuration. Fatal at wrap time.
    #[error("configuration error: {0}")]
    Config(String),

    /// The wrapped target exposes no such method.
    #[error("unknown method: {0}")]
    UnknownMethod(String),

    /// Redaction configuration failed to compile.
    #[error(transparent)]
    Redaction(#[from] RedactionError),

    /// Credential or key material problem.
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// Signing, storage, or status bookkeeping failed.
    #[error(transparent)]
    Chain(#[from] ChainError),

    /// Anchoring infrastructure failed outside the normal
    /// failed/rejected statuses.
    #[error(transparent)]
    Anchor(#[from] AnchorError),

    /// Sync-mode anchoring finished in a non-confirmed state.
    #[error("anchor not confirmed (state {state:?}): {reason}")]
    AnchorNotConfirmed { state: AnchorState, reason: String },

    /// Core validation failure (network ids, timestamps).
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The wrapped target raised. Captured, then passed through.
    #[error("{}: {}", .0.name, .0.message)]
    Target(ErrorInfo),
}

impl WitnessError {
    /// The captured error info when this wraps a target failure.
    pub fn target_error(&self) -> Option<&ErrorInfo> {
        match self {
            Self::Target(info) => Some(info),
            _ => None,
        }
    }
}
