//! # sigil-redact — Sensitive-Data Redaction
//!
//! Pattern-based scrubbing of captured call payloads. The redaction engine
//! runs over every [`serde_json::Value`] entering a signed record, replacing
//! substrings that match a configured rule set with a replacement token.
//!
//! ## Security Invariant
//!
//! Redaction runs **before** hashing and signing. Once a record is signed,
//! its content is immutable, so any sensitive value that survives this pass
//! is permanently embedded in the tamper-evident chain. The engine errs on
//! the side of scrubbing.
//!
//! Properties:
//!
//! - **Idempotent**: applying the engine to already-redacted output is a
//!   no-op (replacement tokens never match any built-in rule).
//! - **Identity when disabled**: `enabled: false` returns input unchanged.
//! - Only strings are rewritten. Numbers, booleans, and null pass through;
//!   objects and arrays are traversed recursively, including map keys'
//!   values (keys themselves are preserved so payload shape is stable).

pub mod engine;
pub mod error;
pub mod rules;

pub use engine::{CustomRule, RedactionConfig, RedactionEngine};
pub use error::RedactionError;
pub use rules::{builtin_rules, RedactionRule};
