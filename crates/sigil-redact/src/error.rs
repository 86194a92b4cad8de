use thiserror::Error;

/// Errors from redaction engine construction.
///
/// Redaction itself is infallible once the engine is built; the only
/// failure mode is an invalid custom pattern at configuration time.
#[derive(Error, Debug)]
pub enum RedactionError {
    /// A custom rule's regular expression failed to compile.
    #[error("invalid redaction pattern '{name}': {source}")]
    InvalidPattern {
        name: String,
        #[source]
        source: regex::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_pattern_display_names_the_rule() {
        let err = RedactionError::InvalidPattern {
            name: "customer-id".to_string(),
            source: regex::Regex::new("(unclosed").unwrap_err(),
        };
        assert!(format!("{err}").contains("customer-id"));
    }
}
