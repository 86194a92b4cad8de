//! # Anchor Service
//!
//! Drives one signed record through the full anchoring lifecycle:
//! fee resolution, submission, confirmation polling, classified failure
//! handling, and capped exponential backoff.
//!
//! The service never mutates records and never touches the record
//! store; it reports progress through the returned [`AnchorStatus`] and
//! mid-flight transitions through the [`AnchorObserver`], and the caller
//! persists what it wants.
//!
//! ## Retry Semantics
//!
//! - Transient errors (network, RPC, confirmation timeout, reverted
//!   transaction) sleep `base_delay * 2^retry_count`, capped, and retry.
//! - A signer/wallet rejection is terminal: the record lands in
//!   `Rejected` with no further attempts.
//! - A fresh anchor gets `max_retries` attempts. An explicit re-entry
//!   via [`AnchorService::retry`] carries the cumulative `retry_count`
//!   forward and grants `max_retries` further attempts.

use std::sync::Arc;
use std::time::Duration;

use sigil_chain::{AnchorState, AnchorStatus, SignedRecord};
use sigil_core::ContentDigest;

use crate::error::AnchorError;
use crate::fee::FeeStrategy;
use crate::payload::PayloadStore;
use crate::target::{AnchorRequest, ConfirmationStatus, LedgerTarget};

/// Upper bound on any single backoff sleep.
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Tuning knobs for the anchoring loop.
#[derive(Debug, Clone)]
pub struct AnchorConfig {
    /// Submission attempts granted per anchor or retry call.
    pub max_retries: u32,
    /// First backoff delay; doubles per accumulated failure.
    pub base_delay: Duration,
    /// Interval between confirmation polls.
    pub confirmation_poll_interval: Duration,
    /// Confirmation polls before a submission counts as timed out.
    pub confirmation_poll_attempts: u32,
}

impl Default for AnchorConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            confirmation_poll_interval: Duration::from_millis(500),
            confirmation_poll_attempts: 20,
        }
    }
}

/// Sink for mid-flight anchoring transitions.
///
/// `Submitted` and `Confirmed` happen inside the service loop, before
/// the final status is returned; observers are how callers persist or
/// surface them as they occur.
pub trait AnchorObserver: Send + Sync {
    fn on_submitted(&self, _entry_hash: &ContentDigest, _transaction_hash: &str) {}
    fn on_confirmed(
        &self,
        _entry_hash: &ContentDigest,
        _transaction_hash: &str,
        _block_number: u64,
    ) {
    }
}

/// Observer that ignores all transitions.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl AnchorObserver for NoopObserver {}

/// Anchors signed records to a ledger target with retries.
pub struct AnchorService {
    target: Arc<dyn LedgerTarget>,
    payloads: Arc<dyn PayloadStore>,
    fee_strategy: FeeStrategy,
    config: AnchorConfig,
    observer: Arc<dyn AnchorObserver>,
}

impl AnchorService {
    pub fn new(
        target: Arc<dyn LedgerTarget>,
        payloads: Arc<dyn PayloadStore>,
        fee_strategy: FeeStrategy,
        config: AnchorConfig,
        observer: Arc<dyn AnchorObserver>,
    ) -> Self {
        Self {
            target,
            payloads,
            fee_strategy,
            config,
            observer,
        }
    }

    /// Anchor a record starting from a fresh `Pending` status.
    ///
    /// Returns the final status: `Confirmed`, `Failed` (attempts
    /// exhausted, `last_error` set), or `Rejected`.
    pub async fn anchor(&self, record: &SignedRecord) -> Result<AnchorStatus, AnchorError> {
        self.run(record, AnchorStatus::pending()).await
    }

    /// Re-enter anchoring for a record that previously failed.
    ///
    /// The carried `retry_count` keeps backoff and accounting
    /// cumulative across re-entries.
    pub async fn retry(
        &self,
        record: &SignedRecord,
        status: &AnchorStatus,
    ) -> Result<AnchorStatus, AnchorError> {
        if status.state != AnchorState::Failed {
            return Err(AnchorError::InvalidConfig(format!(
                "retry requires a failed record, found {:?}",
                status.state
            )));
        }
        self.run(record, status.to_retrying()?).await
    }

    async fn run(
        &self,
        record: &SignedRecord,
        mut status: AnchorStatus,
    ) -> Result<AnchorStatus, AnchorError> {
        let pointer = self.payloads.put(record)?;
        let parent_pointer = (!record.previous_hash.is_zero())
            .then(|| self.payloads.pointer_for(&record.previous_hash));
        let budget = status.retry_count.saturating_add(self.config.max_retries);

        loop {
            match self
                .attempt(record, &pointer, parent_pointer.clone(), &mut status)
                .await
            {
                Ok(()) => return Ok(status),
                Err(err) if err.is_rejection() => {
                    tracing::warn!(
                        entry_hash = %record.entry_hash.to_hex(),
                        error = %err,
                        "anchor rejected by signer, not retrying"
                    );
                    return Ok(status.to_rejected(err.to_string())?);
                }
                Err(err) if err.is_transient() => {
                    let backoff_exponent = status.retry_count;
                    let failures = status.retry_count + 1;
                    status = status.to_failed(failures, err.to_string())?;
                    if failures >= budget {
                        tracing::warn!(
                            entry_hash = %record.entry_hash.to_hex(),
                            attempts = failures,
                            error = %err,
                            "anchor attempts exhausted"
                        );
                        return Ok(status);
                    }
                    let delay = backoff_delay(self.config.base_delay, backoff_exponent);
                    tracing::debug!(
                        entry_hash = %record.entry_hash.to_hex(),
                        attempt = failures,
                        delay_ms = delay.as_millis() as u64,
                        "anchor attempt failed, backing off"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// One submission attempt: price, submit, poll to confirmation.
    async fn attempt(
        &self,
        record: &SignedRecord,
        pointer: &str,
        parent_pointer: Option<String>,
        status: &mut AnchorStatus,
    ) -> Result<(), AnchorError> {
        let suggested = self.target.suggest_fee().await?;
        let fee = self.fee_strategy.apply(suggested);

        let request = AnchorRequest {
            commitment: record.entry_hash,
            pointer: pointer.to_string(),
            parent_pointer,
            fee,
        };
        let receipt = self.target.submit(&request).await?;

        *status = status.to_submitted(&receipt.transaction_hash)?;
        self.observer
            .on_submitted(&record.entry_hash, &receipt.transaction_hash);

        for _ in 0..self.config.confirmation_poll_attempts {
            match self.target.confirmation(&receipt.transaction_hash).await? {
                ConfirmationStatus::Confirmed { block_number } => {
                    *status = status.to_confirmed(block_number)?;
                    self.observer.on_confirmed(
                        &record.entry_hash,
                        &receipt.transaction_hash,
                        block_number,
                    );
                    return Ok(());
                }
                ConfirmationStatus::Failed(reason) => {
                    return Err(AnchorError::TransactionFailed {
                        network: self.target.network().as_str().to_string(),
                        reason,
                    });
                }
                ConfirmationStatus::Pending => {
                    tokio::time::sleep(self.config.confirmation_poll_interval).await;
                }
            }
        }

        Err(AnchorError::Unavailable {
            network: self.target.network().as_str().to_string(),
            reason: format!(
                "confirmation timed out for {}",
                receipt.transaction_hash
            ),
        })
    }
}

fn backoff_delay(base: Duration, retry_count: u32) -> Duration {
    let factor = 2u32.saturating_pow(retry_count.min(16));
    base.saturating_mul(factor).min(MAX_BACKOFF)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::CasPayloadStore;
    use crate::target::{MockBehavior, MockLedgerTarget};
    use parking_lot::Mutex;
    use serde_json::json;
    use sigil_chain::{SigningChain, TraceEntry};
    use sigil_core::Timestamp;
    use sigil_crypto::LocalKeyProvider;

    fn fast_config() -> AnchorConfig {
        AnchorConfig {
            max_retries: 3,
            base_delay: Duration::from_millis(1),
            confirmation_poll_interval: Duration::from_millis(1),
            confirmation_poll_attempts: 2,
        }
    }

    fn service_with(
        target: Arc<MockLedgerTarget>,
        fee_strategy: FeeStrategy,
        observer: Arc<dyn AnchorObserver>,
    ) -> AnchorService {
        AnchorService::new(
            target,
            Arc::new(CasPayloadStore),
            fee_strategy,
            fast_config(),
            observer,
        )
    }

    async fn signed_record() -> SignedRecord {
        let chain = SigningChain::new(Arc::new(
            LocalKeyProvider::from_seed_hex(&"66".repeat(32)).unwrap(),
        ))
        .unwrap();
        chain
            .sign(TraceEntry::success(
                "greet",
                vec![json!("Alice")],
                json!("hi"),
                Timestamp::now(),
                1,
                None,
            ))
            .await
            .unwrap()
    }

    #[derive(Default)]
    struct RecordingObserver {
        events: Mutex<Vec<String>>,
    }

    impl AnchorObserver for RecordingObserver {
        fn on_submitted(&self, _hash: &ContentDigest, tx: &str) {
            self.events.lock().push(format!("submitted:{tx}"));
        }
        fn on_confirmed(&self, _hash: &ContentDigest, tx: &str, block: u64) {
            self.events.lock().push(format!("confirmed:{tx}:{block}"));
        }
    }

    #[tokio::test]
    async fn successful_anchor_confirms_first_try() {
        let target = Arc::new(MockLedgerTarget::local());
        let observer = Arc::new(RecordingObserver::default());
        let service = service_with(Arc::clone(&target), FeeStrategy::Normal, observer.clone());

        let record = signed_record().await;
        let status = service.anchor(&record).await.unwrap();

        assert_eq!(status.state, AnchorState::Confirmed);
        assert_eq!(status.retry_count, 0);
        assert!(status.transaction_hash.is_some());
        assert_eq!(status.block_number, Some(1));
        assert!(status.confirmed_at.is_some());

        let events = observer.events.lock();
        assert_eq!(events.len(), 2);
        assert!(events[0].starts_with("submitted:"));
        assert!(events[1].starts_with("confirmed:"));
    }

    #[tokio::test]
    async fn transient_failure_then_success() {
        let target = Arc::new(MockLedgerTarget::local());
        target.script([MockBehavior::TransientError("connection reset".into())]);
        let service = service_with(Arc::clone(&target), FeeStrategy::Normal, Arc::new(NoopObserver));

        let record = signed_record().await;
        let status = service.anchor(&record).await.unwrap();

        assert_eq!(status.state, AnchorState::Confirmed);
        assert_eq!(status.retry_count, 1);
    }

    #[tokio::test]
    async fn exhausted_attempts_end_failed_with_count() {
        let target = Arc::new(MockLedgerTarget::local());
        target.script([
            MockBehavior::TransientError("down".into()),
            MockBehavior::TransientError("down".into()),
            MockBehavior::TransientError("down".into()),
            MockBehavior::TransientError("down".into()),
        ]);
        let service = service_with(Arc::clone(&target), FeeStrategy::Normal, Arc::new(NoopObserver));

        let record = signed_record().await;
        let status = service.anchor(&record).await.unwrap();

        assert_eq!(status.state, AnchorState::Failed);
        assert_eq!(status.retry_count, 3);
        assert!(status.last_error.as_deref().unwrap().contains("down"));
    }

    #[tokio::test]
    async fn rejection_is_terminal_with_no_retries() {
        let target = Arc::new(MockLedgerTarget::local());
        target.script([
            MockBehavior::Reject("user denied transaction".into()),
            MockBehavior::Succeed,
        ]);
        let service = service_with(Arc::clone(&target), FeeStrategy::Normal, Arc::new(NoopObserver));

        let record = signed_record().await;
        let status = service.anchor(&record).await.unwrap();

        assert_eq!(status.state, AnchorState::Rejected);
        assert_eq!(status.retry_count, 0);
        // The queued success behavior was never consumed.
        assert_eq!(target.accepted_count(), 0);
    }

    #[tokio::test]
    async fn retry_carries_count_forward() {
        let target = Arc::new(MockLedgerTarget::local());
        target.script([
            MockBehavior::TransientError("down".into()),
            MockBehavior::TransientError("down".into()),
            MockBehavior::TransientError("down".into()),
        ]);
        let service = service_with(Arc::clone(&target), FeeStrategy::Normal, Arc::new(NoopObserver));

        let record = signed_record().await;
        let failed = service.anchor(&record).await.unwrap();
        assert_eq!(failed.state, AnchorState::Failed);
        assert_eq!(failed.retry_count, 3);

        // Ledger recovered; the retry succeeds and keeps counting from 3.
        let status = service.retry(&record, &failed).await.unwrap();
        assert_eq!(status.state, AnchorState::Confirmed);
        assert_eq!(status.retry_count, 3);
    }

    #[tokio::test]
    async fn retry_requires_failed_state() {
        let target = Arc::new(MockLedgerTarget::local());
        let service = service_with(Arc::clone(&target), FeeStrategy::Normal, Arc::new(NoopObserver));
        let record = signed_record().await;
        let pending = AnchorStatus::pending();
        assert!(service.retry(&record, &pending).await.is_err());
    }

    #[tokio::test]
    async fn stalled_confirmation_counts_as_transient() {
        let target = Arc::new(MockLedgerTarget::local());
        target.script([MockBehavior::StallConfirmation]);
        let service = service_with(Arc::clone(&target), FeeStrategy::Normal, Arc::new(NoopObserver));

        let record = signed_record().await;
        let status = service.anchor(&record).await.unwrap();

        // First submission stalls past the poll budget, second confirms.
        assert_eq!(status.state, AnchorState::Confirmed);
        assert_eq!(status.retry_count, 1);
        assert!(status.last_error.is_none());
    }

    #[tokio::test]
    async fn fee_strategy_shapes_submitted_fee() {
        let target = Arc::new(MockLedgerTarget::local());
        let service = service_with(
            Arc::clone(&target),
            FeeStrategy::Aggressive,
            Arc::new(NoopObserver),
        );

        let record = signed_record().await;
        service.anchor(&record).await.unwrap();
        // The mock quotes 1_000_000; aggressive pays 50% over.
        assert_eq!(target.last_fee(), Some(1_500_000));
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let base = Duration::from_secs(1);
        assert_eq!(backoff_delay(base, 0), Duration::from_secs(1));
        assert_eq!(backoff_delay(base, 1), Duration::from_secs(2));
        assert_eq!(backoff_delay(base, 3), Duration::from_secs(8));
        assert_eq!(backoff_delay(base, 10), MAX_BACKOFF);
    }
}
