//! # sigil-core — Foundational Types for the Sigil Stack
//!
//! This crate is the bedrock of the Sigil Stack. It defines the type-system
//! primitives that enforce correctness guarantees at compile time. Every
//! other crate in the workspace depends on `sigil-core`; it depends on
//! nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for domain primitives.** `TraceId`, `NetworkId` —
//!    validated constructors, no bare strings or raw UUIDs for identifiers.
//!
//! 2. **`CanonicalBytes` newtype.** ALL digest computation flows through
//!    `CanonicalBytes::new()`. No raw `serde_json::to_vec()` for digests.
//!    Ever. This prevents the canonicalization-split defect class by
//!    construction: two call sites can never hash differently-serialized
//!    forms of the same value.
//!
//! 3. **UTC-only timestamps at millisecond precision.** Capture envelopes
//!    carry call durations in milliseconds, so the `Timestamp` type keeps
//!    millisecond precision — always UTC, always `Z` suffix.
//!
//! 4. **`sha256_digest()` accepts only `&CanonicalBytes`.** Compile-time
//!    enforcement that every digest path flows through canonicalization.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `sigil-*` crates (this is the leaf of the DAG).
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.
//! - All public types derive `Debug`, `Clone`, and implement
//!   `Serialize`/`Deserialize`.

pub mod canonical;
pub mod digest;
pub mod error;
pub mod identity;
pub mod temporal;

// Re-export primary types for ergonomic imports.
pub use canonical::CanonicalBytes;
pub use digest::{sha256_digest, sha256_hex, ContentDigest};
pub use error::{CanonicalizationError, CoreError};
pub use identity::{NetworkId, TraceId};
pub use temporal::Timestamp;
