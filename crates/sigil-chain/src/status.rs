//! # Anchor Status State Machine
//!
//! Every stored record carries a mutable anchoring sidecar. The record
//! content is sealed by its signature; only the sidecar tracks progress
//! against the external ledger.
//!
//! ```text
//!                      +-----------+
//!          +---------->| Submitted |----------+
//!          |           +-----------+          |
//!          |             |       |            v
//!     +---------+        |       |      +-----------+
//!     | Pending |        |       +----->| Confirmed |  (terminal)
//!     +---------+        v              +-----------+
//!      |   |   |     +--------+
//!      |   |   +---->| Failed |<--- retry re-enters via Pending
//!      |   |         +--------+
//!      |   v              |
//!      | +----------+     |
//!      +>| Rejected |     |   (terminal)
//!        +----------+     |
//!          +-----------+  |
//!          | LocalOnly |<-+   (terminal, operator accepts local record)
//!          +-----------+
//! ```
//!
//! Transitions are validated explicitly; an invalid transition is an
//! error, never a silent overwrite.

use serde::{Deserialize, Serialize};
use sigil_core::Timestamp;

use crate::error::ChainError;

/// Anchoring lifecycle state of one stored record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnchorState {
    /// Signed and stored, not yet submitted to the ledger.
    Pending,
    /// Submitted; transaction in flight, awaiting confirmation.
    Submitted,
    /// Confirmed on the ledger. Terminal.
    Confirmed,
    /// All attempts exhausted or attempt errored. Re-enterable via retry.
    Failed,
    /// The signer or wallet refused the submission. Terminal.
    Rejected,
    /// Operator accepted the record as locally verified without an
    /// on-ledger anchor. Terminal.
    LocalOnly,
}

impl AnchorState {
    /// Whether no further transitions are allowed out of this state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Confirmed | Self::Rejected | Self::LocalOnly)
    }
}

/// Validate a proposed state transition.
///
/// `Failed -> Pending` models an explicit retry; `Failed -> Submitted`
/// is also allowed so a retry loop can resubmit directly, and
/// `Failed -> Failed` so a retry that fails again can record its
/// updated attempt count. Other identity transitions are rejected
/// along with everything else not listed.
pub fn validate_transition(from: AnchorState, to: AnchorState) -> Result<(), ChainError> {
    use AnchorState::*;
    let allowed = matches!(
        (from, to),
        (Pending, Submitted)
            | (Pending, Failed)
            | (Pending, Rejected)
            | (Pending, LocalOnly)
            | (Submitted, Confirmed)
            | (Submitted, Failed)
            | (Submitted, Rejected)
            | (Submitted, LocalOnly)
            | (Failed, Pending)
            | (Failed, Submitted)
            | (Failed, Failed)
            | (Failed, Rejected)
            | (Failed, LocalOnly)
    );
    if allowed {
        Ok(())
    } else {
        Err(ChainError::InvalidTransition { from, to })
    }
}

/// Mutable anchoring sidecar for one record, keyed by its entry hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnchorStatus {
    pub state: AnchorState,
    /// Ledger transaction handle, set at submission.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_hash: Option<String>,
    /// Block containing the confirmed transaction.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
    /// When confirmation was observed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirmed_at: Option<Timestamp>,
    /// Cumulative submission attempts beyond the first, carried across
    /// explicit retries.
    pub retry_count: u32,
    /// Most recent failure or rejection reason.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl AnchorStatus {
    /// Fresh sidecar for a newly stored record.
    pub fn pending() -> Self {
        Self {
            state: AnchorState::Pending,
            transaction_hash: None,
            block_number: None,
            confirmed_at: None,
            retry_count: 0,
            last_error: None,
        }
    }

    /// Transition to `Submitted` with the ledger transaction handle.
    pub fn to_submitted(&self, transaction_hash: impl Into<String>) -> Result<Self, ChainError> {
        validate_transition(self.state, AnchorState::Submitted)?;
        Ok(Self {
            state: AnchorState::Submitted,
            transaction_hash: Some(transaction_hash.into()),
            ..self.clone()
        })
    }

    /// Transition to `Confirmed` with the confirming block.
    pub fn to_confirmed(&self, block_number: u64) -> Result<Self, ChainError> {
        validate_transition(self.state, AnchorState::Confirmed)?;
        Ok(Self {
            state: AnchorState::Confirmed,
            block_number: Some(block_number),
            confirmed_at: Some(Timestamp::now()),
            last_error: None,
            ..self.clone()
        })
    }

    /// Transition to `Failed`, recording the attempt count and reason.
    pub fn to_failed(&self, retry_count: u32, error: impl Into<String>) -> Result<Self, ChainError> {
        validate_transition(self.state, AnchorState::Failed)?;
        Ok(Self {
            state: AnchorState::Failed,
            retry_count,
            last_error: Some(error.into()),
            ..self.clone()
        })
    }

    /// Transition to the terminal `Rejected` state.
    pub fn to_rejected(&self, reason: impl Into<String>) -> Result<Self, ChainError> {
        validate_transition(self.state, AnchorState::Rejected)?;
        Ok(Self {
            state: AnchorState::Rejected,
            last_error: Some(reason.into()),
            ..self.clone()
        })
    }

    /// Transition to the terminal `LocalOnly` state.
    pub fn to_local_only(&self) -> Result<Self, ChainError> {
        validate_transition(self.state, AnchorState::LocalOnly)?;
        Ok(Self {
            state: AnchorState::LocalOnly,
            ..self.clone()
        })
    }

    /// Re-enter `Pending` from `Failed` for an explicit retry. The
    /// retry count is preserved so backoff continues where it left off.
    pub fn to_retrying(&self) -> Result<Self, ChainError> {
        validate_transition(self.state, AnchorState::Pending)?;
        Ok(Self {
            state: AnchorState::Pending,
            ..self.clone()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_transitions() {
        let status = AnchorStatus::pending();
        let submitted = status.to_submitted("0xabc").unwrap();
        assert_eq!(submitted.state, AnchorState::Submitted);
        assert_eq!(submitted.transaction_hash.as_deref(), Some("0xabc"));

        let confirmed = submitted.to_confirmed(1042).unwrap();
        assert_eq!(confirmed.state, AnchorState::Confirmed);
        assert_eq!(confirmed.block_number, Some(1042));
        assert!(confirmed.confirmed_at.is_some());
    }

    #[test]
    fn confirmed_is_terminal() {
        let confirmed = AnchorStatus::pending()
            .to_submitted("0xabc")
            .unwrap()
            .to_confirmed(1)
            .unwrap();
        assert!(confirmed.state.is_terminal());
        assert!(matches!(
            confirmed.to_failed(1, "late failure"),
            Err(ChainError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn rejected_is_terminal_and_keeps_reason() {
        let rejected = AnchorStatus::pending()
            .to_rejected("user declined in wallet")
            .unwrap();
        assert!(rejected.state.is_terminal());
        assert_eq!(
            rejected.last_error.as_deref(),
            Some("user declined in wallet")
        );
        assert!(rejected.to_submitted("0x1").is_err());
        assert!(rejected.to_retrying().is_err());
    }

    #[test]
    fn failed_reenters_via_retry_with_count_preserved() {
        let failed = AnchorStatus::pending().to_failed(3, "rpc timeout").unwrap();
        assert_eq!(failed.retry_count, 3);

        let retrying = failed.to_retrying().unwrap();
        assert_eq!(retrying.state, AnchorState::Pending);
        assert_eq!(retrying.retry_count, 3);

        // A retry may also resubmit directly, or fail again with an
        // updated count.
        let failed_again = AnchorStatus::pending().to_failed(1, "x").unwrap();
        assert!(failed_again.to_submitted("0x2").is_ok());
        let twice = failed_again.to_failed(2, "still down").unwrap();
        assert_eq!(twice.retry_count, 2);
    }

    #[test]
    fn local_only_reachable_until_confirmation() {
        assert!(AnchorStatus::pending().to_local_only().is_ok());
        let submitted = AnchorStatus::pending().to_submitted("0xaa").unwrap();
        assert!(submitted.to_local_only().is_ok());
        let failed = AnchorStatus::pending().to_failed(5, "gave up").unwrap();
        assert!(failed.to_local_only().is_ok());
        // But not after submission succeeded.
        let confirmed = AnchorStatus::pending()
            .to_submitted("0x3")
            .unwrap()
            .to_confirmed(9)
            .unwrap();
        assert!(confirmed.to_local_only().is_err());
    }

    #[test]
    fn identity_transition_is_invalid() {
        assert!(matches!(
            validate_transition(AnchorState::Pending, AnchorState::Pending),
            Err(ChainError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn state_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&AnchorState::LocalOnly).unwrap(),
            "\"local_only\""
        );
    }
}
