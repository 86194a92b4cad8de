//! # Error Types — Core Error Hierarchy
//!
//! Defines the error types shared across the workspace roots. All errors use
//! `thiserror` for derive-based `Display` and `Error` implementations.
//! Domain crates layer their own error enums on top of these with `#[from]`
//! conversions.

use thiserror::Error;

/// Top-level error type for foundational operations.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Canonicalization failed.
    #[error("canonicalization error: {0}")]
    Canonicalization(#[from] CanonicalizationError),

    /// A value failed constructor validation.
    #[error("validation error: {0}")]
    Validation(String),
}

/// Error during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// JSON / JCS serialization failed.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}
