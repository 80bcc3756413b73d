//! Error types for the formatting engine
//!
//! Only hard failures live here. Missing entities and unknown change types
//! degrade to absent values plus a diagnostic instead.

use flow_model::{EntityKind, ModelError};

/// Errors raised by the storage collaborator
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Backend could not be reached
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// Backend rejected the query
    #[error("storage query for {kind} failed: {message}")]
    Query { kind: EntityKind, message: String },
}

impl StorageError {
    /// Create query error for kind
    pub fn query(kind: EntityKind, message: impl Into<String>) -> Self {
        Self::Query {
            kind,
            message: message.into(),
        }
    }
}

/// Combined formatter error
#[derive(Debug, thiserror::Error)]
pub enum FormatterError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("model error: {0}")]
    Model(#[from] ModelError),
}

/// Result type alias for formatter operations
pub type FormatterResult<T> = Result<T, FormatterError>;

#[cfg(test)]
mod tests {
    use super::*;
    use flow_model::RevisionKind;

    #[test]
    fn query_error_display() {
        let err = StorageError::query(EntityKind::Revision(RevisionKind::Post), "timeout");
        assert_eq!(err.to_string(), "storage query for post-revision failed: timeout");
    }

    #[test]
    fn error_conversions() {
        let err: FormatterError = StorageError::Unavailable("down".to_string()).into();
        assert!(matches!(err, FormatterError::Storage(_)));
    }
}
