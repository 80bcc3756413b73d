//! Remote mutation API: query maps, submodule prefixes, responses
//!
//! Every board call goes through one multiplexed endpoint. A query names the
//! `action` (normally `flow`), the `submodule`, the `page`, and per-submodule
//! parameters. Submodule parameters carry a short prefix on the wire
//! (`epcontent` for edit-post); callers use the generic `flow_` prefix and
//! [`QueryMap::into_wire`] rewrites it.

use crate::error::ApiFailure;
use async_trait::async_trait;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

/// Generic parameter prefix rewritten per submodule
pub const GENERIC_PREFIX: &str = "flow_";

/// Wire prefix of a submodule's parameters
#[must_use]
pub fn submodule_prefix(submodule: &str) -> Option<&'static str> {
    Some(match submodule {
        "edit-post" => "ep",
        "reply" => "rep",
        "edit-title" => "et",
        "moderate-topic" => "mt",
        "moderate-post" => "mp",
        "view-post" => "vp",
        "view-topic" => "vt",
        "view-topiclist" => "vtl",
        "edit-header" => "eh",
        "new-topic" => "nt",
        "view-header" => "vh",
        "edit-topic-summary" => "ets",
        _ => return None,
    })
}

/// Ordered request parameters plus transport-only hints
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueryMap {
    params: IndexMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    token_type: Option<String>,
}

impl QueryMap {
    /// Create empty query
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Query for a `flow` submodule on `page`
    #[must_use]
    pub fn flow(submodule: &str, page: &str) -> Self {
        Self::new()
            .with("action", "flow")
            .with("submodule", submodule)
            .with("page", page)
    }

    /// With parameter (replaces an existing value)
    #[inline]
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    /// Set parameter (replaces an existing value)
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.params.insert(key.into(), value.into());
    }

    /// Parameter value
    #[inline]
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Remove a parameter
    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.params.shift_remove(key)
    }

    /// Check parameter presence
    #[inline]
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.params.contains_key(key)
    }

    /// Merge `other` over this query; its values win
    #[must_use]
    pub fn merged(mut self, other: QueryMap) -> Self {
        self.params.extend(other.params);
        if other.token_type.is_some() {
            self.token_type = other.token_type;
        }
        self
    }

    /// `action` parameter
    #[inline]
    #[must_use]
    pub fn action(&self) -> Option<&str> {
        self.get("action")
    }

    /// `submodule` parameter
    #[inline]
    #[must_use]
    pub fn submodule(&self) -> Option<&str> {
        self.get("submodule")
    }

    /// Token the transport must attach (`csrf` when unset)
    #[inline]
    #[must_use]
    pub fn token_type(&self) -> &str {
        self.token_type.as_deref().unwrap_or("csrf")
    }

    /// With token type
    #[inline]
    #[must_use]
    pub fn with_token_type(mut self, token_type: impl Into<String>) -> Self {
        self.token_type = Some(token_type.into());
        self
    }

    /// Parameters in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of parameters
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Check if query has no parameters
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Rewrite generic `flow_*` parameters to the submodule's prefix
    ///
    /// Queries for other actions, or submodules without a prefix, are
    /// returned unchanged.
    #[must_use]
    pub fn into_wire(self) -> Self {
        let prefix = match (self.action(), self.submodule()) {
            (Some("flow"), Some(submodule)) => submodule_prefix(submodule),
            _ => None,
        };
        let Some(prefix) = prefix else {
            return self;
        };
        let params = self
            .params
            .into_iter()
            .map(|(key, value)| match key.strip_prefix(GENERIC_PREFIX) {
                Some(rest) => (format!("{prefix}{rest}"), value),
                None => (key, value),
            })
            .collect();
        Self {
            params,
            token_type: self.token_type,
        }
    }
}

/// Transport to the remote API
///
/// `Ok` carries the body of a `done` response, `Err` a `fail` one.
#[async_trait]
pub trait RemoteApi: Send + Sync {
    /// Issue one call
    async fn call(&self, query: QueryMap) -> Result<Value, ApiFailure>;
}

/// Accessors over a `done` response body
#[derive(Debug, Clone, Copy)]
pub struct ApiResponse<'a>(pub &'a Value);

impl<'a> ApiResponse<'a> {
    /// `flow.<submodule>` block
    #[must_use]
    pub fn submodule(&self, submodule: &str) -> Option<&'a Value> {
        self.0.get("flow")?.get(submodule)
    }

    /// `flow.<submodule>.result`
    #[must_use]
    pub fn result(&self, submodule: &str) -> Option<&'a Value> {
        self.submodule(submodule)?.get("result")
    }

    /// `flow.<submodule>.result.topic`
    #[must_use]
    pub fn topic(&self, submodule: &str) -> Option<&'a Value> {
        self.result(submodule)?.get("topic")
    }

    /// `flow.<submodule>.workflow`
    #[must_use]
    pub fn workflow(&self, submodule: &str) -> Option<&'a str> {
        self.submodule(submodule)?.get("workflow")?.as_str()
    }

    /// `flow.<submodule>.committed.topic["post-revision-id"]`
    #[must_use]
    pub fn committed_revision(&self, submodule: &str) -> Option<&'a str> {
        self.submodule(submodule)?
            .get("committed")?
            .get("topic")?
            .get("post-revision-id")?
            .as_str()
    }

    /// Whether `watch[0]` carries a `watched` field
    #[must_use]
    pub fn watched(&self) -> bool {
        self.0
            .pointer("/watch/0")
            .and_then(|entry| entry.get("watched"))
            .is_some()
    }
}
