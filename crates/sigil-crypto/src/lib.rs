//! # sigil-crypto — Cryptographic Primitives for the Sigil Stack
//!
//! This crate provides the cryptographic building blocks used throughout
//! the workspace:
//!
//! - **Ed25519** signing and verification for chain-linked call records,
//!   taking [`CanonicalBytes`](sigil_core::CanonicalBytes) as the only
//!   signable input.
//! - **Signer addresses** — hex-encoded Ed25519 verifying keys used as the
//!   stable identity a signed record is attributed to.
//! - **Key providers** — a trait abstracting where key material lives
//!   (in-memory, environment, or behind an interactive approval gate that
//!   may decline to sign).

pub mod ed25519;
pub mod error;
pub mod key_provider;

// Re-export primary types.
pub use ed25519::{
    verify, verify_with_address, Ed25519KeyPair, Ed25519PublicKey, Ed25519Signature, SignerAddress,
};
pub use error::CryptoError;
pub use key_provider::{ApprovalDecision, ApprovalGate, EnvKeyProvider, KeyProvider, LocalKeyProvider, PromptKeyProvider};
