//! Error types for pitwall-core
//!
//! There is no fatal error class in this crate: failures local to a single
//! event are logged and swallowed at the boundary so that one instance's bad
//! input can never affect another instance or the registry as a whole.

use thiserror::Error;

/// Result type alias using the library's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for pitwall-core
#[derive(Error, Debug)]
pub enum Error {
    /// An inbound supervisor event was missing or mistyping required fields.
    /// Caught at the boundary, logged once, and the event is discarded.
    #[error("malformed event: {0}")]
    MalformedEvent(String),

    /// Configuration failed validation.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A crash signature pattern failed to compile.
    #[error("invalid crash signature {pattern:?}: {source}")]
    Signature {
        pattern: String,
        #[source]
        source: Box<regex::Error>,
    },

    /// The external export collaborator reported a failure. Surfaced as a
    /// single error-level log entry, never propagated to the caller.
    #[error("log export failed: {0}")]
    Export(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_event_displays_reason() {
        let err = Error::MalformedEvent("missing field `instanceId`".to_string());
        assert_eq!(
            err.to_string(),
            "malformed event: missing field `instanceId`"
        );
    }

    #[test]
    fn export_error_carries_cause() {
        let err = Error::Export("disk full".to_string());
        assert!(err.to_string().contains("disk full"));
    }

    #[test]
    fn signature_error_names_pattern() {
        let source = regex::Regex::new("(").unwrap_err();
        let err = Error::Signature {
            pattern: "(".to_string(),
            source: Box::new(source),
        };
        assert!(err.to_string().contains("invalid crash signature"));
    }
}
