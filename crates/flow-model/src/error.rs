//! Error types for the entity model

/// Errors raised while building or decoding entities
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// Identifier token could not be parsed
    #[error("invalid entity identifier '{value}': {reason}")]
    InvalidId { value: String, reason: String },

    /// Unknown moderation state name
    #[error("unknown moderation state: {0}")]
    UnknownModerationState(String),

    /// Unknown revision kind name
    #[error("unknown revision kind: {0}")]
    UnknownRevisionKind(String),

    /// Entity payload could not be decoded
    #[error("malformed entity: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Result type alias for model operations
pub type ModelResult<T> = Result<T, ModelError>;
