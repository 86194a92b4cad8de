//! # Local Record Store
//!
//! Cache of signed records keyed by entry hash, with per-record anchor
//! status and capacity accounting. The store is the durable source for
//! chain-tip recovery; the signing chain only caches the tip.
//!
//! Capacity is a soft limit: appends are never dropped. Crossing the
//! warning threshold upward yields a [`CapacityWarning`] exactly once;
//! the latch re-arms when usage falls back below the threshold (for the
//! in-memory store, that means after `clear`).

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sigil_core::ContentDigest;

use crate::error::ChainError;
use crate::record::SignedRecord;
use crate::status::{validate_transition, AnchorState, AnchorStatus};

/// Default soft limit on cached records.
pub const DEFAULT_CACHE_LIMIT: usize = 10_000;

/// Default fraction of the limit at which the capacity warning fires.
pub const DEFAULT_WARNING_THRESHOLD: f64 = 0.8;

/// Derived storage snapshot. Computed on demand, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageStats {
    pub total_records: usize,
    pub pending_records: usize,
    pub confirmed_records: usize,
    /// Approximate JSON-encoded size of all cached records.
    pub storage_bytes: u64,
    /// Used fraction of the record limit, as a percentage.
    pub capacity_percent: f64,
}

/// Emitted once when cache usage crosses the warning threshold upward.
#[derive(Debug, Clone, PartialEq)]
pub struct CapacityWarning {
    pub used: usize,
    pub limit: usize,
    pub capacity_percent: f64,
}

/// A record paired with its mutable anchoring sidecar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub record: SignedRecord,
    pub status: AnchorStatus,
}

/// Storage backend for signed records.
///
/// Implementations must reject duplicate entry hashes on append and
/// unknown hashes or invalid state transitions on status update.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Prepare the store for use.
    async fn initialize(&self) -> Result<(), ChainError>;

    /// Append a record with a fresh `Pending` sidecar.
    ///
    /// Returns a [`CapacityWarning`] if this append crossed the warning
    /// threshold. Appends past the limit still succeed (soft limit).
    async fn append(&self, record: SignedRecord) -> Result<Option<CapacityWarning>, ChainError>;

    /// Fetch one record by entry hash.
    async fn get(&self, hash: &ContentDigest) -> Result<Option<StoredRecord>, ChainError>;

    /// All records in append order.
    async fn get_all(&self) -> Result<Vec<StoredRecord>, ChainError>;

    /// All records currently in the given anchor state, in append order.
    async fn get_by_state(&self, state: AnchorState) -> Result<Vec<StoredRecord>, ChainError>;

    /// Replace a record's sidecar, validating the state transition.
    async fn update_status(
        &self,
        hash: &ContentDigest,
        status: AnchorStatus,
    ) -> Result<(), ChainError>;

    /// The most recently appended record, for chain-tip recovery.
    async fn latest(&self) -> Result<Option<SignedRecord>, ChainError>;

    /// Derived storage snapshot.
    async fn stats(&self) -> Result<StorageStats, ChainError>;

    /// Remove all records and reset capacity accounting.
    async fn clear(&self) -> Result<(), ChainError>;

    /// Release the store. Subsequent operations fail with
    /// [`ChainError::StoreClosed`].
    async fn close(&self) -> Result<(), ChainError>;
}

/// In-memory [`RecordStore`] backed by a concurrent map.
///
/// Per-record operations are atomic on the map entry; `get_all` and
/// `stats` are point-in-time snapshots.
pub struct MemoryRecordStore {
    records: DashMap<ContentDigest, StoredRecord>,
    /// Append order, for `get_all` and `latest`.
    order: Mutex<Vec<ContentDigest>>,
    bytes: AtomicU64,
    limit: usize,
    warning_threshold: f64,
    warned: AtomicBool,
    closed: AtomicBool,
}

impl MemoryRecordStore {
    pub fn new(limit: usize, warning_threshold: f64) -> Self {
        Self {
            records: DashMap::new(),
            order: Mutex::new(Vec::new()),
            bytes: AtomicU64::new(0),
            limit,
            warning_threshold,
            warned: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_CACHE_LIMIT, DEFAULT_WARNING_THRESHOLD)
    }

    fn ensure_open(&self) -> Result<(), ChainError> {
        if self.closed.load(Ordering::SeqCst) {
            Err(ChainError::StoreClosed)
        } else {
            Ok(())
        }
    }

    fn usage(&self, total: usize) -> f64 {
        if self.limit == 0 {
            return 1.0;
        }
        total as f64 / self.limit as f64
    }

    /// Synchronous status update, for callers outside an async context
    /// (e.g. observer hooks). Same validation as the trait method.
    pub fn update_status_blocking(
        &self,
        hash: &ContentDigest,
        status: AnchorStatus,
    ) -> Result<(), ChainError> {
        self.ensure_open()?;
        let mut entry = self
            .records
            .get_mut(hash)
            .ok_or_else(|| ChainError::UnknownRecord(hash.to_hex()))?;
        validate_transition(entry.status.state, status.state)?;
        entry.status = status;
        Ok(())
    }

    /// Synchronous lookup counterpart to [`RecordStore::get`].
    pub fn get_blocking(&self, hash: &ContentDigest) -> Result<Option<StoredRecord>, ChainError> {
        self.ensure_open()?;
        Ok(self.records.get(hash).map(|entry| entry.value().clone()))
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn initialize(&self) -> Result<(), ChainError> {
        self.ensure_open()
    }

    async fn append(&self, record: SignedRecord) -> Result<Option<CapacityWarning>, ChainError> {
        self.ensure_open()?;
        let hash = record.entry_hash;
        let encoded_len = serde_json::to_vec(&record)
            .map_err(sigil_core::CanonicalizationError::from)?
            .len() as u64;

        match self.records.entry(hash) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                return Err(ChainError::DuplicateRecord(hash.to_hex()));
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(StoredRecord {
                    record,
                    status: AnchorStatus::pending(),
                });
            }
        }
        self.order.lock().push(hash);
        self.bytes.fetch_add(encoded_len, Ordering::SeqCst);

        let total = self.records.len();
        let usage = self.usage(total);
        if usage >= self.warning_threshold && !self.warned.swap(true, Ordering::SeqCst) {
            tracing::warn!(
                used = total,
                limit = self.limit,
                "record cache crossed capacity warning threshold"
            );
            return Ok(Some(CapacityWarning {
                used: total,
                limit: self.limit,
                capacity_percent: usage * 100.0,
            }));
        }
        Ok(None)
    }

    async fn get(&self, hash: &ContentDigest) -> Result<Option<StoredRecord>, ChainError> {
        self.ensure_open()?;
        Ok(self.records.get(hash).map(|entry| entry.value().clone()))
    }

    async fn get_all(&self) -> Result<Vec<StoredRecord>, ChainError> {
        self.ensure_open()?;
        let order = self.order.lock();
        Ok(order
            .iter()
            .filter_map(|hash| self.records.get(hash).map(|e| e.value().clone()))
            .collect())
    }

    async fn get_by_state(&self, state: AnchorState) -> Result<Vec<StoredRecord>, ChainError> {
        Ok(self
            .get_all()
            .await?
            .into_iter()
            .filter(|stored| stored.status.state == state)
            .collect())
    }

    async fn update_status(
        &self,
        hash: &ContentDigest,
        status: AnchorStatus,
    ) -> Result<(), ChainError> {
        self.update_status_blocking(hash, status)
    }

    async fn latest(&self) -> Result<Option<SignedRecord>, ChainError> {
        self.ensure_open()?;
        let order = self.order.lock();
        Ok(order
            .last()
            .and_then(|hash| self.records.get(hash).map(|e| e.record.clone())))
    }

    async fn stats(&self) -> Result<StorageStats, ChainError> {
        self.ensure_open()?;
        let total = self.records.len();
        let mut pending = 0usize;
        let mut confirmed = 0usize;
        for entry in self.records.iter() {
            match entry.status.state {
                AnchorState::Pending | AnchorState::Submitted => pending += 1,
                AnchorState::Confirmed => confirmed += 1,
                _ => {}
            }
        }
        Ok(StorageStats {
            total_records: total,
            pending_records: pending,
            confirmed_records: confirmed,
            storage_bytes: self.bytes.load(Ordering::SeqCst),
            capacity_percent: self.usage(total) * 100.0,
        })
    }

    async fn clear(&self) -> Result<(), ChainError> {
        self.ensure_open()?;
        self.records.clear();
        self.order.lock().clear();
        self.bytes.store(0, Ordering::SeqCst);
        // Usage dropped below threshold, so the warning latch re-arms.
        self.warned.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&self) -> Result<(), ChainError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}
