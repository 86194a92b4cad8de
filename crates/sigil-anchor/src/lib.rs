//! # sigil-anchor — External Ledger Anchoring
//!
//! Anchors signed call records to an external, unreliable ledger. The
//! ledger provides public timestamping and tamper evidence beyond the
//! local chain; the system stays fully functional without it (records
//! can be marked locally verified).
//!
//! ## Architecture
//!
//! - [`ChainRegistry`] maps network identifiers to RPC endpoints,
//!   ledger program addresses, and explorer URL templates.
//! - [`FeeStrategy`] shapes the fee quoted by the target before every
//!   submission attempt.
//! - [`LedgerTarget`] is the sealed adapter trait: a scriptable
//!   [`MockLedgerTarget`] for development and tests, and
//!   [`EvmLedgerTarget`] speaking EVM JSON-RPC over HTTPS.
//! - [`PayloadStore`] produces the off-chain content pointers the ledger
//!   transaction references; the default stores nothing and emits
//!   content-addressed `cas://` pointers.
//! - [`AnchorService`] drives one record through submit, confirmation
//!   polling, classified failure handling, and capped exponential
//!   backoff, reporting mid-flight transitions to an [`AnchorObserver`].

pub mod error;
pub mod fee;
pub mod payload;
pub mod registry;
pub mod service;
pub mod target;

pub use error::AnchorError;
pub use fee::FeeStrategy;
pub use payload::{CasPayloadStore, PayloadStore};
pub use registry::{ChainRegistry, NetworkProfile};
pub use service::{AnchorConfig, AnchorObserver, AnchorService, NoopObserver};
pub use target::{
    AnchorRequest, ConfirmationStatus, LedgerTarget, MockBehavior, MockLedgerTarget, SubmitReceipt,
};

#[cfg(feature = "evm-anchor")]
pub use target::evm::{EvmLedgerConfig, EvmLedgerTarget};
