//! Capture envelope for one intercepted method call.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sigil_core::{sha256_digest, CanonicalBytes, ContentDigest, Timestamp, TraceId};

use crate::error::ChainError;

/// Structured error information captured from a failed call.
///
/// Mirrors what the target raised: the error's type name, its message,
/// and an optional stack trace. All three pass through redaction before
/// the envelope is hashed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub name: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

impl ErrorInfo {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
            stack: None,
        }
    }

    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }
}

/// One captured method invocation, complete and immutable.
///
/// Exactly one of `result` / `error` is populated. The envelope is built
/// only after the call finishes; there is no partially-filled state.
/// `parent_id` records the call that was in flight when this one began,
/// captured at call start.
///
/// The entry's content digest ([`TraceEntry::entry_hash`]) is computed
/// over canonical bytes, so field order and whitespace never affect it.
/// `None` fields are omitted from the canonical form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEntry {
    pub id: TraceId,
    pub method: String,
    pub args: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
    pub timestamp: Timestamp,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<TraceId>,
}

impl TraceEntry {
    /// Envelope for a call that returned a value.
    pub fn success(
        method: impl Into<String>,
        args: Vec<Value>,
        result: Value,
        timestamp: Timestamp,
        duration_ms: u64,
        parent_id: Option<TraceId>,
    ) -> Self {
        Self {
            id: TraceId::new(),
            method: method.into(),
            args,
            result: Some(result),
            error: None,
            timestamp,
            duration_ms,
            parent_id,
        }
    }

    /// Envelope for a call that raised.
    pub fn failure(
        method: impl Into<String>,
        args: Vec<Value>,
        error: ErrorInfo,
        timestamp: Timestamp,
        duration_ms: u64,
        parent_id: Option<TraceId>,
    ) -> Self {
        Self {
            id: TraceId::new(),
            method: method.into(),
            args,
            result: None,
            error: Some(error),
            timestamp,
            duration_ms,
            parent_id,
        }
    }

    /// Whether the captured call succeeded.
    pub fn succeeded(&self) -> bool {
        self.result.is_some()
    }

    /// Content digest of this envelope over its canonical bytes.
    pub fn entry_hash(&self) -> Result<ContentDigest, ChainError> {
        let canonical = CanonicalBytes::new(self)?;
        Ok(sha256_digest(&canonical))
    }
}
