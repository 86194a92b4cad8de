//! # sigil-witness — The Witness Runtime
//!
//! Wraps a stateful target so that every method call is captured,
//! redacted, signed into the tamper-evident chain, cached locally, and
//! anchored to an external ledger — without changing what the caller
//! sees. Results and errors pass through unmodified; only the records
//! are scrubbed and sealed.
//!
//! ## Call Pipeline
//!
//! ```text
//! call(method, args)
//!   ├─ capture parent id (top of the logical call stack)
//!   ├─ invoke the target, time it
//!   ├─ redact args / result / error
//!   ├─ sign into the single-writer chain
//!   ├─ append to the local store (capacity accounting)
//!   └─ hand the record to the consistency strategy
//! ```
//!
//! The [`ConsistencyMode`] decides how anchoring relates to the call:
//! blocking (`Sync`, the default), fire-and-forget (`Async`), batched
//! (`Cache`), or submitted-then-queried (`TwoPhase`).

pub mod callbacks;
pub mod config;
pub mod error;
pub mod interceptable;
pub mod stack;
pub mod strategy;
pub mod witness;

pub use callbacks::Callbacks;
pub use config::{ConsistencyMode, Credential, RuntimeConfig};
pub use error::WitnessError;
pub use interceptable::{Interceptable, TargetError};
pub use witness::Witness;
