//! Lifecycle callbacks with panic isolation.
//!
//! Callbacks are observation points, never control flow: a panicking
//! callback is caught, logged, and ignored so it can never corrupt the
//! chain, the store, or an in-flight anchor.

use std::panic::{catch_unwind, AssertUnwindSafe};

use sigil_chain::{CapacityWarning, SignedRecord, TraceEntry};
use sigil_core::ContentDigest;

type CapturedFn = Box<dyn Fn(&TraceEntry) + Send + Sync>;
type RecordFn = Box<dyn Fn(&SignedRecord) + Send + Sync>;
type SubmittedFn = Box<dyn Fn(&ContentDigest, &str) + Send + Sync>;
type ConfirmedFn = Box<dyn Fn(&ContentDigest, &str, u64) + Send + Sync>;
type FailedFn = Box<dyn Fn(&ContentDigest, &str) + Send + Sync>;
type CapacityFn = Box<dyn Fn(&CapacityWarning) + Send + Sync>;

/// Optional observation hooks for the witness lifecycle.
#[derive(Default)]
pub struct Callbacks {
    /// A call was captured and redacted, before signing.
    pub on_action_captured: Option<CapturedFn>,
    /// A record was signed and stored.
    pub on_record_created: Option<RecordFn>,
    /// An anchor transaction was accepted by the ledger.
    pub on_anchor_submitted: Option<SubmittedFn>,
    /// An anchor was confirmed on the ledger.
    pub on_anchor_confirmed: Option<ConfirmedFn>,
    /// Anchoring ended in `Failed` or `Rejected`; the argument is the
    /// final error or rejection reason.
    pub on_anchor_failed: Option<FailedFn>,
    /// The local cache crossed its capacity warning threshold.
    pub on_capacity_warning: Option<CapacityFn>,
}

impl std::fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Callbacks")
            .field("on_action_captured", &self.on_action_captured.is_some())
            .field("on_record_created", &self.on_record_created.is_some())
            .field("on_anchor_submitted", &self.on_anchor_submitted.is_some())
            .field("on_anchor_confirmed", &self.on_anchor_confirmed.is_some())
            .field("on_anchor_failed", &self.on_anchor_failed.is_some())
            .field("on_capacity_warning", &self.on_capacity_warning.is_some())
            .finish()
    }
}

impl Callbacks {
    pub fn action_captured(&self, entry: &TraceEntry) {
        if let Some(callback) = &self.on_action_captured {
            guard("on_action_captured", || callback(entry));
        }
    }

    pub fn record_created(&self, record: &SignedRecord) {
        if let Some(callback) = &self.on_record_created {
            guard("on_record_created", || callback(record));
        }
    }

    pub fn anchor_submitted(&self, entry_hash: &ContentDigest, transaction_hash: &str) {
        if let Some(callback) = &self.on_anchor_submitted {
            guard("on_anchor_submitted", || {
                callback(entry_hash, transaction_hash)
            });
        }
    }

    pub fn anchor_confirmed(
        &self,
        entry_hash: &ContentDigest,
        transaction_hash: &str,
        block_number: u64,
    ) {
        if let Some(callback) = &self.on_anchor_confirmed {
            guard("on_anchor_confirmed", || {
                callback(entry_hash, transaction_hash, block_number)
            });
        }
    }

    pub fn anchor_failed(&self, entry_hash: &ContentDigest, error: &str) {
        if let Some(callback) = &self.on_anchor_failed {
            guard("on_anchor_failed", || callback(entry_hash, error));
        }
    }

    pub fn capacity_warning(&self, warning: &CapacityWarning) {
        if let Some(callback) = &self.on_capacity_warning {
            guard("on_capacity_warning", || callback(warning));
        }
    }
}

/// Run a callback, containing any panic it raises.
fn guard<F: FnOnce()>(name: &str, f: F) {
    if catch_unwind(AssertUnwindSafe(f)).is_err() {
        tracing::warn!(callback = name, "callback panicked, ignoring");
    }
}
