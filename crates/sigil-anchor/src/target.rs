//! # Ledger Targets
//!
//! The [`LedgerTarget`] trait is the adapter seam for external ledgers.
//! The trait is **sealed** — only implementations within this crate are
//! permitted, preventing unaudited targets from weakening the anchoring
//! guarantees the rest of the stack assumes.
//!
//! ## Security Invariant
//!
//! `submit` must only return `Ok` once the ledger has accepted the
//! transaction for inclusion. Returning `Ok` for a dropped submission
//! would let the service report `Submitted` for a record the ledger has
//! never seen.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use sigil_core::{ContentDigest, NetworkId};

use crate::error::AnchorError;

/// One submission request: the record commitment plus off-chain
/// pointers and the resolved fee for this attempt.
#[derive(Debug, Clone)]
pub struct AnchorRequest {
    /// Commitment digest being anchored (the record's entry hash).
    pub commitment: ContentDigest,
    /// Pointer to the off-chain record payload.
    pub pointer: String,
    /// Pointer to the predecessor's payload, absent for genesis-linked
    /// records.
    pub parent_pointer: Option<String>,
    /// Fee for this attempt, already shaped by the fee strategy.
    pub fee: u128,
}

/// Handle returned by a successful submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitReceipt {
    pub transaction_hash: String,
}

/// Confirmation state of a submitted transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmationStatus {
    /// Still in flight.
    Pending,
    /// Included in a block.
    Confirmed { block_number: u64 },
    /// The ledger executed and rejected the transaction.
    Failed(String),
}

/// Sealed adapter trait for external ledgers.
#[async_trait]
pub trait LedgerTarget: private::Sealed + Send + Sync {
    /// Current suggested fee on this network.
    async fn suggest_fee(&self) -> Result<u128, AnchorError>;

    /// Submit an anchor transaction. `Ok` means the ledger accepted the
    /// transaction for inclusion, not that it is confirmed.
    async fn submit(&self, request: &AnchorRequest) -> Result<SubmitReceipt, AnchorError>;

    /// Poll the confirmation state of a submitted transaction.
    async fn confirmation(&self, transaction_hash: &str) -> Result<ConfirmationStatus, AnchorError>;

    /// The network this target anchors to.
    fn network(&self) -> &NetworkId;
}

mod private {
    pub trait Sealed {}
    impl Sealed for super::MockLedgerTarget {}
    #[cfg(feature = "evm-anchor")]
    impl Sealed for super::evm::EvmLedgerTarget {}
}

/// Scripted behavior for one [`MockLedgerTarget`] submission.
#[derive(Debug, Clone)]
pub enum MockBehavior {
    /// Accept and confirm in the next block.
    Succeed,
    /// Fail with a transient network error.
    TransientError(String),
    /// Refuse as a signer/wallet rejection.
    Reject(String),
    /// Accept, but leave the transaction unconfirmed.
    StallConfirmation,
}

/// In-process ledger for development and tests.
///
/// Submissions consume scripted behaviors in order; once the script is
/// exhausted every submission succeeds. Block numbers increment per
/// accepted transaction, and suggested fees are constant.
///
/// Provides no anchoring guarantees whatsoever.
pub struct MockLedgerTarget {
    network: NetworkId,
    script: Mutex<VecDeque<MockBehavior>>,
    next_block: AtomicU64,
    submissions: DashMap<String, ConfirmationStatus>,
    suggested_fee: u128,
    last_fee: Mutex<Option<u128>>,
}

impl MockLedgerTarget {
    pub fn new(network: NetworkId) -> Self {
        Self {
            network,
            script: Mutex::new(VecDeque::new()),
            next_block: AtomicU64::new(1),
            submissions: DashMap::new(),
            suggested_fee: 1_000_000,
            last_fee: Mutex::new(None),
        }
    }

    /// Mock on a local throwaway network id.
    pub fn local() -> Self {
        // Static identifier, always valid.
        Self::new(NetworkId::new("mock-local").expect("static network id"))
    }

    /// Queue behaviors for the next submissions, in order.
    pub fn script(&self, behaviors: impl IntoIterator<Item = MockBehavior>) {
        self.script.lock().extend(behaviors);
    }

    /// Number of transactions this mock has accepted.
    pub fn accepted_count(&self) -> usize {
        self.submissions.len()
    }

    /// Fee carried by the most recent submission attempt.
    pub fn last_fee(&self) -> Option<u128> {
        *self.last_fee.lock()
    }
}

#[async_trait]
impl LedgerTarget for MockLedgerTarget {
    async fn suggest_fee(&self) -> Result<u128, AnchorError> {
        Ok(self.suggested_fee)
    }

    async fn submit(&self, request: &AnchorRequest) -> Result<SubmitReceipt, AnchorError> {
        *self.last_fee.lock() = Some(request.fee);
        let behavior = self
            .script
            .lock()
            .pop_front()
            .unwrap_or(MockBehavior::Succeed);

        match behavior {
            MockBehavior::TransientError(reason) => Err(AnchorError::Unavailable {
                network: self.network.as_str().to_string(),
                reason,
            }),
            MockBehavior::Reject(reason) => Err(AnchorError::Rejected(reason)),
            MockBehavior::Succeed => {
                let block = self.next_block.fetch_add(1, Ordering::SeqCst);
                let tx = format!(
                    "mock-tx-{}-{block}",
                    request.commitment.to_hex().get(..16).unwrap_or("unknown")
                );
                self.submissions
                    .insert(tx.clone(), ConfirmationStatus::Confirmed { block_number: block });
                Ok(SubmitReceipt {
                    transaction_hash: tx,
                })
            }
            MockBehavior::StallConfirmation => {
                let block = self.next_block.fetch_add(1, Ordering::SeqCst);
                let tx = format!(
                    "mock-tx-{}-{block}",
                    request.commitment.to_hex().get(..16).unwrap_or("unknown")
                );
                self.submissions
                    .insert(tx.clone(), ConfirmationStatus::Pending);
                Ok(SubmitReceipt {
                    transaction_hash: tx,
                })
            }
        }
    }

    async fn confirmation(&self, transaction_hash: &str) -> Result<ConfirmationStatus, AnchorError> {
        self.submissions
            .get(transaction_hash)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| AnchorError::TransactionFailed {
                network: self.network.as_str().to_string(),
                reason: format!("unknown transaction: {transaction_hash}"),
            })
    }

    fn network(&self) -> &NetworkId {
        &self.network
    }
}

#[cfg(feature = "evm-anchor")]
pub mod evm;
