//! The target seam: anything whose method calls can be witnessed.

use async_trait::async_trait;
use serde_json::Value;
use sigil_chain::ErrorInfo;
use thiserror::Error;

/// A failure raised by the wrapped target.
///
/// Carries what the target threw, shaped for capture: type name,
/// message, and an optional stack trace. The witness records it (after
/// redaction) and re-raises it to the caller unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{name}: {message}")]
pub struct TargetError {
    pub name: String,
    pub message: String,
    pub stack: Option<String>,
}

impl TargetError {
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

    pub fn to_error_info(&self) -> ErrorInfo {
        let info = ErrorInfo::new(&self.name, &self.message);
        match &self.stack {
            Some(stack) => info.with_stack(stack),
            None => info,
        }
    }
}

/// A stateful object whose methods the witness can intercept.
///
/// Implementations expose a method table and a uniform dynamic entry
/// point. Sync-completing and genuinely async methods both go through
/// `invoke`; a sync method simply returns without awaiting anything.
///
/// Arguments and results are JSON values because captured payloads
/// must be serializable into canonical bytes for hashing.
#[async_trait]
pub trait Interceptable: Send + Sync {
    /// The callable method names this target exposes.
    fn methods(&self) -> Vec<String>;

    /// Invoke a method by name.
    async fn invoke(&self, method: &str, args: &[Value]) -> Result<Value, TargetError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_error_converts_to_error_info() {
        let err = TargetError::new("TimeoutError", "request timed out").with_stack("at fetch:3");
        let info = err.to_error_info();
        assert_eq!(info.name, "TimeoutError");
        assert_eq!(info.message, "request timed out");
        assert_eq!(info.stack.as_deref(), Some("at fetch:3"));
    }

    #[test]
    fn target_error_displays_name_and_message() {
        let err = TargetError::new("ValueError", "negative amount");
        assert_eq!(format!("{err}"), "ValueError: negative amount");
    }
}
