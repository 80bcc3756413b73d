//! Entity kinds as understood by the storage collaborator

use crate::id::EntityId;
use crate::revision::{Revision, RevisionKind};
use crate::workflow::Workflow;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Storage class of an entity; one multi-get is issued per kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "kind", content = "revision")]
pub enum EntityKind {
    /// Workflow rows
    Workflow,
    /// Revision rows of the given kind
    Revision(RevisionKind),
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Workflow => f.write_str("workflow"),
            Self::Revision(kind) => write!(f, "{kind}-revision"),
        }
    }
}

/// An entity as returned by storage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "type")]
pub enum StoredEntity {
    /// A workflow row
    Workflow(Workflow),
    /// A revision row
    Revision(Revision),
}

impl StoredEntity {
    /// Identifier the entity is keyed by
    #[inline]
    #[must_use]
    pub fn id(&self) -> EntityId {
        match self {
            Self::Workflow(w) => w.id(),
            Self::Revision(r) => r.id(),
        }
    }

    /// Storage kind
    #[inline]
    #[must_use]
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::Workflow(_) => EntityKind::Workflow,
            Self::Revision(r) => EntityKind::Revision(r.kind()),
        }
    }
}

impl From<Workflow> for StoredEntity {
    fn from(value: Workflow) -> Self {
        Self::Workflow(value)
    }
}

impl From<Revision> for StoredEntity {
    fn from(value: Revision) -> Self {
        Self::Revision(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_display() {
        assert_eq!(EntityKind::Workflow.to_string(), "workflow");
        assert_eq!(
            EntityKind::Revision(RevisionKind::PostSummary).to_string(),
            "post-summary-revision"
        );
    }

    #[test]
    fn stored_entity_kind() {
        let revision = Revision::builder(RevisionKind::Header, EntityId::new()).build();
        let entity = StoredEntity::from(revision.clone());
        assert_eq!(entity.id(), revision.id());
        assert_eq!(entity.kind(), EntityKind::Revision(RevisionKind::Header));
    }
}
