//! The witness orchestrator.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use serde_json::Value;
use sigil_anchor::{
    AnchorConfig, AnchorObserver, AnchorService, CasPayloadStore, ChainRegistry, LedgerTarget,
};
use sigil_chain::{
    AnchorState, AnchorStatus, ErrorInfo, MemoryRecordStore, RecordStore, SignedRecord,
    SigningChain, StorageStats, StoredRecord, TraceEntry,
};
use sigil_core::{ContentDigest, NetworkId, Timestamp, TraceId};
use sigil_redact::RedactionEngine;
use tokio::task::JoinHandle;

use crate::callbacks::Callbacks;
use crate::config::{ConsistencyMode, RuntimeConfig};
use crate::error::WitnessError;
use crate::interceptable::Interceptable;
use crate::stack::CallStack;
use crate::strategy::CacheBuffer;

/// Bridges the anchor service's mid-flight transitions into the store
/// and the user callbacks.
struct TransitionObserver {
    store: Arc<MemoryRecordStore>,
    callbacks: Arc<Callbacks>,
}

impl AnchorObserver for TransitionObserver {
    fn on_submitted(&self, entry_hash: &ContentDigest, transaction_hash: &str) {
        match self.store.get_blocking(entry_hash) {
            Ok(Some(stored)) => {
                if let Ok(next) = stored.status.to_submitted(transaction_hash) {
                    if let Err(err) = self.store.update_status_blocking(entry_hash, next) {
                        tracing::debug!(error = %err, "skipped stale submitted transition");
                    }
                }
            }
            _ => {}
        }
        self.callbacks.anchor_submitted(entry_hash, transaction_hash);
    }

    fn on_confirmed(&self, entry_hash: &ContentDigest, transaction_hash: &str, block_number: u64) {
        // The store transition to Confirmed is applied with the final
        // status, which carries the cumulative retry count.
        self.callbacks
            .anchor_confirmed(entry_hash, transaction_hash, block_number);
    }
}

/// Everything the background tasks need, shared behind an `Arc`.
struct WitnessCore {
    mode: ConsistencyMode,
    network: NetworkId,
    redactor: RedactionEngine,
    chain: SigningChain,
    store: Arc<MemoryRecordStore>,
    service: AnchorService,
    registry: ChainRegistry,
    callbacks: Arc<Callbacks>,
    stack: CallStack,
    buffer: CacheBuffer,
    cache_batch_size: usize,
}

impl WitnessCore {
    /// Anchor a record and persist its final status.
    async fn anchor_and_apply(&self, record: &SignedRecord) -> Result<AnchorStatus, WitnessError> {
        let status = self.service.anchor(record).await?;
        self.apply_final(&record.entry_hash, &status);
        Ok(status)
    }

    /// Retry a failed record and persist its final status.
    async fn retry_and_apply(
        &self,
        record: &SignedRecord,
        current: &AnchorStatus,
    ) -> Result<AnchorStatus, WitnessError> {
        let status = self.service.retry(record, current).await?;
        self.apply_final(&record.entry_hash, &status);
        Ok(status)
    }

    /// Record a terminal anchoring outcome in the store and fire the
    /// failure callback where it applies.
    fn apply_final(&self, entry_hash: &ContentDigest, status: &AnchorStatus) {
        match status.state {
            AnchorState::Confirmed | AnchorState::Failed | AnchorState::Rejected => {
                if let Err(err) = self.store.update_status_blocking(entry_hash, status.clone()) {
                    tracing::warn!(
                        entry_hash = %entry_hash.to_hex(),
                        error = %err,
                        "could not record final anchor status"
                    );
                }
                if matches!(status.state, AnchorState::Failed | AnchorState::Rejected) {
                    let reason = status
                        .last_error
                        .clone()
                        .unwrap_or_else(|| "anchoring failed".to_string());
                    self.callbacks.anchor_failed(entry_hash, &reason);
                }
            }
            _ => {}
        }
    }

    /// Background anchoring entry point for async and two-phase modes.
    async fn anchor_in_background(&self, record: SignedRecord) {
        if let Err(err) = self.anchor_and_apply(&record).await {
            tracing::warn!(
                entry_hash = %record.entry_hash.to_hex(),
                error = %err,
                "background anchoring failed"
            );
            self.callbacks
                .anchor_failed(&record.entry_hash, &err.to_string());
        }
    }

    /// Anchor every buffered record, then drain the processed batch.
    ///
    /// Per-record outcomes land in each record's status; the batch is
    /// removed from the buffer only after all attempts complete, so a
    /// crash mid-flush never silently drops records.
    async fn flush(&self) -> usize {
        let batch = self.buffer.snapshot();
        for hash in &batch {
            match self.store.get(hash).await {
                Ok(Some(stored)) if stored.status.state == AnchorState::Pending => {
                    self.anchor_in_background(stored.record).await;
                }
                Ok(_) => {}
                Err(err) => {
                    tracing::warn!(entry_hash = %hash.to_hex(), error = %err, "flush lookup failed");
                }
            }
        }
        self.buffer.remove(&batch);
        batch.len()
    }
}

/// A wrapped target: every call through [`Witness::call`] is captured,
/// redacted, signed, stored, and anchored per the configured
/// consistency mode, while the caller sees exactly what the bare
/// target would have returned or raised.
pub struct Witness<T: Interceptable> {
    target: Arc<T>,
    methods: HashSet<String>,
    core: Arc<WitnessCore>,
    flush_task: Mutex<Option<JoinHandle<()>>>,
}

impl<T: Interceptable> Witness<T> {
    /// Wrap a target using the network's registry profile and the EVM
    /// JSON-RPC ledger target.
    ///
    /// The profile must carry a submitter address; the default registry
    /// profiles do not, so production callers register their own.
    #[cfg(feature = "evm-anchor")]
    pub async fn wrap(
        target: T,
        config: RuntimeConfig,
        registry: ChainRegistry,
    ) -> Result<Self, WitnessError> {
        use sigil_anchor::{EvmLedgerConfig, EvmLedgerTarget};

        let profile = registry.get(&config.network)?.clone();
        let submitter = profile.submitter_address.clone().ok_or_else(|| {
            WitnessError::Config(format!(
                "network {} has no submitter address configured",
                config.network.as_str()
            ))
        })?;
        let ledger = EvmLedgerTarget::new(EvmLedgerConfig::new(
            profile.rpc_url,
            profile.ledger_address,
            submitter,
            config.network.clone(),
        ))?;
        Self::wrap_with_ledger(target, config, Arc::new(ledger), registry).await
    }

    /// Wrap a target with an explicit ledger target and registry.
    ///
    /// This is the seam development and test setups use with the mock
    /// ledger; production code normally goes through [`Witness::wrap`].
    pub async fn wrap_with_ledger(
        target: T,
        config: RuntimeConfig,
        ledger: Arc<dyn LedgerTarget>,
        registry: ChainRegistry,
    ) -> Result<Self, WitnessError> {
        config.validate()?;

        let RuntimeConfig {
            consistency_mode,
            network,
            credential,
            fee_strategy,
            redaction,
            callbacks,
            max_retries,
            base_delay,
            cache_flush_interval,
            cache_batch_size,
            local_cache_limit,
            capacity_warning_threshold,
        } = config;

        let redactor = RedactionEngine::new(&redaction)?;
        let provider = credential.build_provider()?;
        let callbacks = Arc::new(callbacks);

        let store = Arc::new(MemoryRecordStore::new(
            local_cache_limit,
            capacity_warning_threshold,
        ));
        store.initialize().await?;

        // Resume the chain from the store's last record, if any.
        let chain = match store.latest().await? {
            Some(last) => SigningChain::resume_from(provider, last.entry_hash)?,
            None => SigningChain::new(provider)?,
        };

        let observer = TransitionObserver {
            store: Arc::clone(&store),
            callbacks: Arc::clone(&callbacks),
        };
        let service = AnchorService::new(
            ledger,
            Arc::new(CasPayloadStore),
            fee_strategy,
            AnchorConfig {
                max_retries,
                base_delay,
                ..AnchorConfig::default()
            },
            Arc::new(observer),
        );

        let methods = target.methods().into_iter().collect();
        let core = Arc::new(WitnessCore {
            mode: consistency_mode,
            network,
            redactor,
            chain,
            store,
            service,
            registry,
            callbacks,
            stack: CallStack::new(),
            buffer: CacheBuffer::new(),
            cache_batch_size,
        });

        let flush_task = match (consistency_mode, cache_flush_interval) {
            (ConsistencyMode::Cache, Some(interval)) => {
                let core = Arc::clone(&core);
                Some(tokio::spawn(async move {
                    let mut ticker = tokio::time::interval(interval);
                    // The first tick completes immediately; skip it.
                    ticker.tick().await;
                    loop {
                        ticker.tick().await;
                        if !core.buffer.is_empty() {
                            core.flush().await;
                        }
                    }
                }))
            }
            _ => None,
        };

        Ok(Self {
            target: Arc::new(target),
            methods,
            core,
            flush_task: Mutex::new(flush_task),
        })
    }

    /// The wrapped target's callable method names.
    pub fn methods(&self) -> impl Iterator<Item = &str> {
        self.methods.iter().map(String::as_str)
    }

    /// Invoke a method on the wrapped target, capturing it into the
    /// signed chain.
    ///
    /// The caller sees the target's own result or error; capture,
    /// redaction, and anchoring never alter them. In sync mode the call
    /// additionally fails if the record could not be anchored.
    pub async fn call(&self, method: &str, args: Vec<Value>) -> Result<Value, WitnessError> {
        if !self.methods.contains(method) {
            return Err(WitnessError::UnknownMethod(method.to_string()));
        }

        let id = TraceId::new();
        let parent_id = self.core.stack.begin(id);
        let started = Timestamp::now();
        let clock = Instant::now();

        let outcome = self.target.invoke(method, &args).await;

        let duration_ms = clock.elapsed().as_millis() as u64;
        self.core.stack.end(id);

        // Redaction runs on everything entering the record; the values
        // returned to the caller stay untouched.
        let redactor = &self.core.redactor;
        let (result, error) = match &outcome {
            Ok(value) => (Some(redactor.redact_value(value)), None),
            Err(target_err) => {
                let info = target_err.to_error_info();
                let redacted = ErrorInfo {
                    name: redactor.redact_str(&info.name),
                    message: redactor.redact_str(&info.message),
                    stack: info.stack.as_deref().map(|s| redactor.redact_str(s)),
                };
                (None, Some(redacted))
            }
        };

        let entry = TraceEntry {
            id,
            method: method.to_string(),
            args: redactor.redact_values(&args),
            result,
            error,
            timestamp: started,
            duration_ms,
            parent_id,
        };

        self.core.callbacks.action_captured(&entry);
        let record = self.core.chain.sign(entry).await?;
        let warning = self.core.store.append(record.clone()).await?;
        self.core.callbacks.record_created(&record);
        if let Some(warning) = warning {
            self.core.callbacks.capacity_warning(&warning);
        }

        match self.core.mode {
            ConsistencyMode::Sync => {
                let status = self.core.anchor_and_apply(&record).await?;
                if status.state != AnchorState::Confirmed {
                    return Err(WitnessError::AnchorNotConfirmed {
                        state: status.state,
                        reason: status
                            .last_error
                            .unwrap_or_else(|| "anchoring did not confirm".to_string()),
                    });
                }
            }
            ConsistencyMode::Async | ConsistencyMode::TwoPhase => {
                let core = Arc::clone(&self.core);
                tokio::spawn(async move {
                    core.anchor_in_background(record).await;
                });
            }
            ConsistencyMode::Cache => {
                let buffered = self.core.buffer.push(record.entry_hash);
                if buffered >= self.core.cache_batch_size {
                    let core = Arc::clone(&self.core);
                    tokio::spawn(async move {
                        core.flush().await;
                    });
                }
            }
        }

        match outcome {
            Ok(value) => Ok(value),
            Err(target_err) => Err(WitnessError::Target(target_err.to_error_info())),
        }
    }

    /// Records not yet confirmed on the ledger: pending, submitted, and
    /// failed, in append order.
    pub async fn pending_records(&self) -> Result<Vec<StoredRecord>, WitnessError> {
        let all = self.core.store.get_all().await?;
        Ok(all
            .into_iter()
            .filter(|stored| {
                matches!(
                    stored.status.state,
                    AnchorState::Pending | AnchorState::Submitted | AnchorState::Failed
                )
            })
            .collect())
    }

    /// All records in append order.
    pub async fn records(&self) -> Result<Vec<StoredRecord>, WitnessError> {
        Ok(self.core.store.get_all().await?)
    }

    /// Current anchor status of a record.
    pub async fn anchor_status(
        &self,
        entry_hash: &ContentDigest,
    ) -> Result<Option<AnchorStatus>, WitnessError> {
        Ok(self
            .core
            .store
            .get(entry_hash)
            .await?
            .map(|stored| stored.status))
    }

    /// Re-anchor a failed record, carrying its retry count forward.
    pub async fn retry_anchor(
        &self,
        entry_hash: &ContentDigest,
    ) -> Result<AnchorStatus, WitnessError> {
        let stored = self
            .core
            .store
            .get(entry_hash)
            .await?
            .ok_or_else(|| sigil_chain::ChainError::UnknownRecord(entry_hash.to_hex()))?;
        self.core
            .retry_and_apply(&stored.record, &stored.status)
            .await
    }

    /// Accept a record as locally verified without a ledger anchor.
    pub async fn mark_locally_verified(
        &self,
        entry_hash: &ContentDigest,
    ) -> Result<(), WitnessError> {
        let stored = self
            .core
            .store
            .get(entry_hash)
            .await?
            .ok_or_else(|| sigil_chain::ChainError::UnknownRecord(entry_hash.to_hex()))?;
        let next = stored.status.to_local_only()?;
        Ok(self.core.store.update_status(entry_hash, next).await?)
    }

    /// Derived storage snapshot.
    pub async fn storage_stats(&self) -> Result<StorageStats, WitnessError> {
        Ok(self.core.store.stats().await?)
    }

    /// Anchor every buffered record now (cache mode). Returns the size
    /// of the flushed batch.
    pub async fn flush_cache(&self) -> usize {
        self.core.flush().await
    }

    /// Explorer URL for a record's anchor transaction, if the record is
    /// submitted or confirmed and the network has an explorer template.
    pub async fn explorer_url(
        &self,
        entry_hash: &ContentDigest,
    ) -> Result<Option<String>, WitnessError> {
        let status = self.anchor_status(entry_hash).await?;
        Ok(status
            .and_then(|s| s.transaction_hash)
            .and_then(|tx| self.core.registry.explorer_url(&self.core.network, &tx)))
    }

    /// Verify every stored record and the linkage between them.
    pub async fn verify_chain(&self) -> Result<(), WitnessError> {
        let records: Vec<SignedRecord> = self
            .core
            .store
            .get_all()
            .await?
            .into_iter()
            .map(|stored| stored.record)
            .collect();
        Ok(SigningChain::verify_chain(&records)?)
    }

    /// Flush any buffered work and release the store.
    pub async fn close(&self) -> Result<(), WitnessError> {
        if let Some(task) = self.flush_task.lock().take() {
            task.abort();
        }
        if self.core.mode == ConsistencyMode::Cache {
            self.core.flush().await;
        }
        Ok(self.core.store.close().await?)
    }
}
