//! Request-scoped entity cache using moka
//!
//! Two independent maps (workflows, revisions) keyed by identifier. The
//! caches are unbounded and never expire: an entry, once present, is never
//! fetched again for the lifetime of the owning formatter, which is expected
//! to live for a single request.

use flow_model::{EntityId, Revision, Workflow};
use moka::future::Cache;
use std::sync::Arc;

/// Entry counts, for diagnostics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Cached workflows
    pub workflows: u64,
    /// Cached revisions
    pub revisions: u64,
}

/// Workflow and revision memoization
#[derive(Debug, Clone)]
pub struct EntityCache {
    workflows: Cache<EntityId, Arc<Workflow>>,
    revisions: Cache<EntityId, Arc<Revision>>,
}

impl EntityCache {
    /// Create empty cache
    #[must_use]
    pub fn new() -> Self {
        Self {
            workflows: Cache::builder().build(),
            revisions: Cache::builder().build(),
        }
    }

    /// Cached workflow
    #[inline]
    pub async fn workflow(&self, id: &EntityId) -> Option<Arc<Workflow>> {
        self.workflows.get(id).await
    }

    /// Cached revision
    #[inline]
    pub async fn revision(&self, id: &EntityId) -> Option<Arc<Revision>> {
        self.revisions.get(id).await
    }

    /// Store a workflow under its own id
    #[inline]
    pub async fn insert_workflow(&self, workflow: Arc<Workflow>) {
        self.workflows.insert(workflow.id(), workflow).await;
    }

    /// Store a revision under its own id
    #[inline]
    pub async fn insert_revision(&self, revision: Arc<Revision>) {
        self.revisions.insert(revision.id(), revision).await;
    }

    /// Check if a workflow is cached
    #[inline]
    #[must_use]
    pub fn contains_workflow(&self, id: &EntityId) -> bool {
        self.workflows.contains_key(id)
    }

    /// Check if a revision is cached
    #[inline]
    #[must_use]
    pub fn contains_revision(&self, id: &EntityId) -> bool {
        self.revisions.contains_key(id)
    }

    /// Exact entry counts
    pub async fn stats(&self) -> CacheStats {
        self.workflows.run_pending_tasks().await;
        self.revisions.run_pending_tasks().await;
        CacheStats {
            workflows: self.workflows.entry_count(),
            revisions: self.revisions.entry_count(),
        }
    }
}

impl Default for EntityCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flow_model::RevisionKind;

    #[tokio::test]
    async fn cache_insert_and_get() {
        let cache = EntityCache::new();
        let workflow = Arc::new(Workflow::topic(EntityId::new()));

        cache.insert_workflow(Arc::clone(&workflow)).await;

        let retrieved = cache.workflow(&workflow.id()).await;
        assert_eq!(retrieved.as_deref(), Some(workflow.as_ref()));
        assert!(cache.contains_workflow(&workflow.id()));
    }

    #[tokio::test]
    async fn cache_returns_none_for_missing() {
        let cache = EntityCache::new();
        assert!(cache.revision(&EntityId::new()).await.is_none());
    }

    #[tokio::test]
    async fn maps_are_independent() {
        let cache = EntityCache::new();
        let revision = Arc::new(Revision::builder(RevisionKind::Post, EntityId::new()).build());
        cache.insert_revision(Arc::clone(&revision)).await;

        assert!(cache.contains_revision(&revision.id()));
        assert!(!cache.contains_workflow(&revision.id()));
    }

    #[tokio::test]
    async fn cache_stats() {
        let cache = EntityCache::default();
        for _ in 0..3 {
            cache.insert_workflow(Arc::new(Workflow::topic(EntityId::new()))).await;
        }
        cache
            .insert_revision(Arc::new(Revision::builder(RevisionKind::Header, EntityId::new()).build()))
            .await;

        let stats = cache.stats().await;
        assert_eq!(stats, CacheStats { workflows: 3, revisions: 1 });
    }
}
