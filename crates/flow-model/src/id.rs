//! Entity identifiers
//!
//! Workflows, revisions and posts share one identifier space. Identifiers are
//! 128-bit ULIDs: the canonical form is the fixed-length 26 character
//! Crockford base32 string, which sorts in creation order.

use crate::error::ModelError;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Mutex;
use ulid::Ulid;

/// Last identifier handed out by [`EntityId::new`]
static LAST_ISSUED: Mutex<Option<Ulid>> = Mutex::new(None);

/// Globally unique, lexically sortable entity identifier
///
/// # Invariants
/// - Two identifiers are equal iff their canonical strings are equal
/// - Immutable once assigned
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(Ulid);

impl EntityId {
    /// Generate a new identifier, strictly greater than any issued before
    #[must_use]
    pub fn new() -> Self {
        let fresh = Ulid::new();
        let mut last = LAST_ISSUED.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let next = match *last {
            Some(prev) if fresh <= prev => prev.increment().unwrap_or(fresh),
            _ => fresh,
        };
        *last = Some(next);
        Self(next)
    }

    /// Build an identifier from a millisecond timestamp and random bits
    #[inline]
    #[must_use]
    pub fn from_parts(timestamp_ms: u64, random: u128) -> Self {
        Self(Ulid::from_parts(timestamp_ms, random))
    }

    /// Parse a canonical (or lower-case) identifier string
    ///
    /// # Errors
    /// Returns [`ModelError::InvalidId`] for anything that is not a 26
    /// character base32 token
    pub fn parse(value: &str) -> Result<Self, ModelError> {
        Ulid::from_string(value.trim())
            .map(Self)
            .map_err(|e| ModelError::InvalidId {
                value: value.to_string(),
                reason: e.to_string(),
            })
    }

    /// Canonical string form
    #[inline]
    #[must_use]
    pub fn canonical(&self) -> String {
        self.0.to_string()
    }

    /// Creation time embedded in the identifier
    #[must_use]
    pub fn timestamp(&self) -> DateTime<Utc> {
        let millis = i64::try_from(self.0.timestamp_ms()).unwrap_or(i64::MAX);
        Utc.timestamp_millis_opt(millis)
            .single()
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Underlying ULID
    #[inline]
    #[must_use]
    pub fn as_ulid(&self) -> Ulid {
        self.0
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EntityId {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<Ulid> for EntityId {
    fn from(value: Ulid) -> Self {
        Self(value)
    }
}

/// Anything that can be normalized into an [`EntityId`]
///
/// Loaders accept raw tokens and identifier objects alike; everything is
/// normalized before it is compared or used as a cache key.
pub trait IntoEntityId {
    /// Normalize into the canonical identifier
    ///
    /// # Errors
    /// Returns [`ModelError::InvalidId`] if a raw token does not parse
    fn into_entity_id(self) -> Result<EntityId, ModelError>;
}

impl IntoEntityId for EntityId {
    fn into_entity_id(self) -> Result<EntityId, ModelError> {
        Ok(self)
    }
}

impl IntoEntityId for &EntityId {
    fn into_entity_id(self) -> Result<EntityId, ModelError> {
        Ok(*self)
    }
}

impl IntoEntityId for Ulid {
    fn into_entity_id(self) -> Result<EntityId, ModelError> {
        Ok(EntityId(self))
    }
}

impl IntoEntityId for &str {
    fn into_entity_id(self) -> Result<EntityId, ModelError> {
        EntityId::parse(self)
    }
}

impl IntoEntityId for String {
    fn into_entity_id(self) -> Result<EntityId, ModelError> {
        EntityId::parse(&self)
    }
}

impl IntoEntityId for &String {
    fn into_entity_id(self) -> Result<EntityId, ModelError> {
        EntityId::parse(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn canonical_form_is_fixed_length() {
        let id = EntityId::new();
        assert_eq!(id.canonical().len(), 26);
        assert!(id.canonical().chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn lower_case_tokens_normalize() {
        let id = EntityId::new();
        let lowered = id.canonical().to_lowercase();
        assert_eq!(EntityId::parse(&lowered).unwrap(), id);
        assert_eq!(lowered.as_str().into_entity_id().unwrap(), id);
    }

    #[test]
    fn invalid_token_rejected() {
        let err = EntityId::parse("not-an-id").unwrap_err();
        assert!(matches!(err, ModelError::InvalidId { .. }));
    }

    #[test]
    fn new_ids_are_monotonic() {
        let ids: Vec<EntityId> = (0..64).map(|_| EntityId::new()).collect();
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn timestamp_comes_from_identifier() {
        let id = EntityId::from_parts(1_400_000_000_000, 7);
        assert_eq!(id.timestamp().timestamp_millis(), 1_400_000_000_000);
    }

    proptest! {
        #[test]
        fn prop_canonical_roundtrip_equality(ms in 0u64..(1u64 << 47), random in any::<u128>()) {
            let id = EntityId::from_parts(ms, random);
            let parsed = EntityId::parse(&id.canonical()).unwrap();
            prop_assert_eq!(parsed, id);
            prop_assert_eq!(parsed.canonical(), id.canonical());
        }
    }
}
