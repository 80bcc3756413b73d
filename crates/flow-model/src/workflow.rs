//! Workflows: root containers of boards and topics

use crate::id::EntityId;
use crate::title::{PageTitle, NS_TOPIC};
use chrono::{DateTime, Utc};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

/// What a workflow roots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowKind {
    /// A discussion board (holds a header and a topic list)
    Discussion,
    /// A single topic
    Topic,
}

/// Root container for a topic or board
///
/// Read-only from the formatter's point of view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workflow {
    id: EntityId,
    kind: WorkflowKind,
    page: PageTitle,
    #[serde(default)]
    post_ids: IndexSet<EntityId>,
    last_updated: DateTime<Utc>,
}

impl Workflow {
    /// Create a workflow rooted on `page`
    #[must_use]
    pub fn new(id: EntityId, kind: WorkflowKind, page: PageTitle) -> Self {
        Self {
            id,
            kind,
            page,
            post_ids: IndexSet::new(),
            last_updated: id.timestamp(),
        }
    }

    /// Create a topic workflow living at `Topic:<id>`
    #[must_use]
    pub fn topic(id: EntityId) -> Self {
        Self::new(id, WorkflowKind::Topic, PageTitle::new(NS_TOPIC, id.to_string()))
    }

    /// Append posts to the ordered post set (duplicates are ignored)
    #[must_use]
    pub fn with_posts(mut self, posts: impl IntoIterator<Item = EntityId>) -> Self {
        self.post_ids.extend(posts);
        self
    }

    /// Set the last-updated timestamp
    #[inline]
    #[must_use]
    pub fn with_last_updated(mut self, at: DateTime<Utc>) -> Self {
        self.last_updated = at;
        self
    }

    /// Workflow identifier
    #[inline]
    #[must_use]
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Workflow kind
    #[inline]
    #[must_use]
    pub fn kind(&self) -> WorkflowKind {
        self.kind
    }

    /// Page the workflow is rendered on
    #[inline]
    #[must_use]
    pub fn page(&self) -> &PageTitle {
        &self.page
    }

    /// Ordered post identifiers forming the tree
    #[inline]
    #[must_use]
    pub fn post_ids(&self) -> &IndexSet<EntityId> {
        &self.post_ids
    }

    /// Last update time
    #[inline]
    #[must_use]
    pub fn last_updated(&self) -> DateTime<Utc> {
        self.last_updated
    }
}
