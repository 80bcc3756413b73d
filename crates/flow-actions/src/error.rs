//! Error types for the action taxonomy

/// Errors raised while assembling a taxonomy
#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    /// Alias points at a name with no definition
    #[error("alias '{alias}' targets unknown action '{target}'")]
    DanglingAlias { alias: String, target: String },

    /// Alias points at another alias
    #[error("alias '{alias}' targets another alias '{target}'")]
    ChainedAlias { alias: String, target: String },

    /// Name already registered
    #[error("action already registered: {0}")]
    Duplicate(String),
}
