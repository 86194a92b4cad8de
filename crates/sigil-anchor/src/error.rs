//! Errors from ledger anchoring operations.

use sigil_chain::ChainError;
use thiserror::Error;

/// Errors from anchoring a record to an external ledger.
///
/// The retry loop classifies these: [`AnchorError::Rejected`] is
/// terminal and never retried; everything else network-shaped is
/// transient and subject to backoff.
#[derive(Error, Debug)]
pub enum AnchorError {
    /// The signer or wallet refused the submission. Terminal.
    #[error("anchor rejected by signer: {0}")]
    Rejected(String),

    /// The ledger endpoint is unreachable or misbehaving.
    #[error("ledger unavailable ({network}): {reason}")]
    Unavailable { network: String, reason: String },

    /// The ledger accepted the request but the transaction failed.
    #[error("anchor transaction failed on {network}: {reason}")]
    TransactionFailed { network: String, reason: String },

    /// No profile registered for the requested network.
    #[error("unknown network: {0}")]
    UnknownNetwork(String),

    /// Target or service configuration is invalid.
    #[error("invalid anchor configuration: {0}")]
    InvalidConfig(String),

    /// A status transition was refused while recording progress.
    #[error("anchor status error: {0}")]
    Status(#[from] ChainError),
}

impl AnchorError {
    /// Whether this is a user/wallet rejection (terminal, never retried).
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }

    /// Whether the retry loop may attempt this operation again.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Unavailable { .. } | Self::TransactionFailed { .. }
        )
    }
}
