//! Error types for the board client
//!
//! Remote failures carry the API's failure code and the raw response body
//! so handlers can build localized messages and detect edit conflicts.

use serde_json::Value;

/// Failure code the API uses for edit conflicts
pub const EDIT_CONFLICT_CODE: &str = "prev_revision";

/// Failure code of transport-level errors
pub const HTTP_FAILURE_CODE: &str = "http";

/// A failed remote call
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("api call failed: {code}")]
pub struct ApiFailure {
    /// Failure code (`http`, `prev_revision`, ...)
    pub code: String,
    /// Response body, `Null` when there was none
    pub body: Value,
}

impl ApiFailure {
    /// Create failure with a code and body
    #[inline]
    #[must_use]
    pub fn new(code: impl Into<String>, body: Value) -> Self {
        Self {
            code: code.into(),
            body,
        }
    }

    /// Transport failure without body
    #[inline]
    #[must_use]
    pub fn http() -> Self {
        Self::new(HTTP_FAILURE_CODE, Value::Null)
    }

    /// Whether the server rejected the submission for a stale revision
    #[inline]
    #[must_use]
    pub fn is_edit_conflict(&self) -> bool {
        self.code == EDIT_CONFLICT_CODE
    }

    /// Revision the server currently holds, for edit conflicts
    #[must_use]
    pub fn conflict_revision(&self) -> Option<&str> {
        if !self.is_edit_conflict() {
            return None;
        }
        self.body
            .pointer("/error/prev_revision/extra/revision_id")
            .and_then(Value::as_str)
    }

    /// `error.info` of the body, if any
    #[must_use]
    pub fn info(&self) -> Option<&str> {
        self.body.pointer("/error/info").and_then(Value::as_str)
    }
}

/// Main client error type
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Remote call failed
    #[error(transparent)]
    Api(#[from] ApiFailure),

    /// Element already has a mutation in flight
    #[error("element {node} already has a request in progress")]
    InProgress {
        /// The marked element
        node: crate::dom::NodeId,
    },

    /// Response lacked an expected field
    #[error("malformed response: missing {0}")]
    MalformedResponse(String),

    /// Template could not be rendered
    #[error("template {name} failed: {message}")]
    Template {
        /// Template name
        name: String,
        /// Cause
        message: String,
    },

    /// Selector did not parse
    #[error("invalid selector {0:?}")]
    InvalidSelector(String),

    /// Editor format was never registered
    #[error("unknown editor format {0:?}")]
    UnknownEditor(String),

    /// Node id does not belong to the document
    #[error("no such node {0}")]
    NoSuchNode(crate::dom::NodeId),

    /// Json (de)serialization failed
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ClientError {
    /// Remote failure behind this error, if any
    #[inline]
    #[must_use]
    pub fn api_failure(&self) -> Option<&ApiFailure> {
        match self {
            Self::Api(failure) => Some(failure),
            _ => None,
        }
    }
}

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;
