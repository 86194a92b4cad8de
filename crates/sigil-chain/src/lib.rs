//! # sigil-chain — Tamper-Evident Call Record Chain
//!
//! The heart of the Sigil Stack: captured method invocations become
//! immutable, chain-linked, Ed25519-signed records.
//!
//! - [`TraceEntry`] — the capture envelope for one method call (arguments,
//!   outcome, timing, causal parent).
//! - [`SignedRecord`] — an entry bound into the hash chain: its content
//!   digest, the previous record's digest, and a signature over the
//!   commitment of both.
//! - [`SigningChain`] — the single-writer signer. All appends serialize
//!   through one async lock so the `previous_hash` linkage is total and
//!   gap-free.
//! - [`AnchorStatus`] — the mutable anchoring sidecar with an explicit
//!   state machine. Record content is never mutated after signing; only
//!   the sidecar changes.
//! - [`RecordStore`] / [`MemoryRecordStore`] — local cache of signed
//!   records with capacity accounting.
//!
//! ## Security Invariant
//!
//! A record's four integrity fields (`entry_hash`, `previous_hash`,
//! `signature`, `signer_address`) are derived exclusively from canonical
//! bytes. Any post-hoc edit to an entry or to the linkage fields makes
//! [`SignedRecord::verify`] return false, and [`SigningChain::verify_chain`]
//! reports the first index at which a chain breaks.

pub mod chain;
pub mod envelope;
pub mod error;
pub mod record;
pub mod status;
pub mod store;

pub use chain::{SigningChain, GENESIS};
pub use envelope::{ErrorInfo, TraceEntry};
pub use error::ChainError;
pub use record::SignedRecord;
pub use status::{validate_transition, AnchorState, AnchorStatus};
pub use store::{CapacityWarning, MemoryRecordStore, RecordStore, StorageStats, StoredRecord};
