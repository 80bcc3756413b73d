//! Batch loader
//!
//! Deduplicates requested identifiers against the [`EntityCache`] and issues
//! one storage multi-get per entity kind for whatever is still missing.
//!
//! # Guarantees
//! - At most one storage call per distinct kind per load, none when every
//!   identifier is already cached (or the request is empty)
//! - Fetched entities are cached before the call returns
//! - Result maps only hold identifiers storage actually returned; callers
//!   check for absence instead of assuming a 1:1 count

use crate::cache::EntityCache;
use crate::error::FormatterResult;
use crate::storage::Storage;
use flow_model::{EntityId, EntityKind, IntoEntityId, Revision, RevisionKind, StoredEntity, Workflow};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// A resolved entity, shared with the cache
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedEntity {
    /// Workflow
    Workflow(Arc<Workflow>),
    /// Revision of any kind
    Revision(Arc<Revision>),
}

/// Deduplicating multi-get front for [`Storage`]
#[derive(Clone)]
pub struct BatchLoader {
    storage: Arc<dyn Storage>,
    cache: EntityCache,
}

impl std::fmt::Debug for BatchLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchLoader")
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

impl BatchLoader {
    /// Create loader with an empty cache
    #[inline]
    #[must_use]
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self::with_cache(storage, EntityCache::new())
    }

    /// Create loader over an existing cache
    #[inline]
    #[must_use]
    pub fn with_cache(storage: Arc<dyn Storage>, cache: EntityCache) -> Self {
        Self { storage, cache }
    }

    /// Underlying cache
    #[inline]
    #[must_use]
    pub fn cache(&self) -> &EntityCache {
        &self.cache
    }

    /// Resolve identifiers of one kind
    ///
    /// Raw tokens and identifier objects are both accepted; tokens that do not
    /// parse are skipped with a warning.
    ///
    /// # Errors
    /// Returns error if the storage call itself fails
    pub async fn resolve<I>(
        &self,
        kind: EntityKind,
        ids: I,
    ) -> FormatterResult<BTreeMap<EntityId, ResolvedEntity>>
    where
        I: IntoIterator,
        I::Item: IntoEntityId,
    {
        self.resolve_normalized(kind, normalize(ids)).await
    }

    /// Batch-load workflows
    ///
    /// # Errors
    /// Returns error if the storage call fails
    pub async fn load_workflows<I>(&self, ids: I) -> FormatterResult<BTreeMap<EntityId, Arc<Workflow>>>
    where
        I: IntoIterator,
        I::Item: IntoEntityId,
    {
        let resolved = self.resolve(EntityKind::Workflow, ids).await?;
        Ok(resolved
            .into_iter()
            .filter_map(|(id, entity)| match entity {
                ResolvedEntity::Workflow(w) => Some((id, w)),
                ResolvedEntity::Revision(_) => None,
            })
            .collect())
    }

    /// Batch-load revisions grouped by kind
    ///
    /// Groups sharing a kind are merged, so each kind costs at most one
    /// storage call. All kinds share one identifier → revision cache.
    ///
    /// # Errors
    /// Returns error if any storage call fails
    pub async fn load_revisions<I, J>(
        &self,
        requests: I,
    ) -> FormatterResult<BTreeMap<EntityId, Arc<Revision>>>
    where
        I: IntoIterator<Item = (RevisionKind, J)>,
        J: IntoIterator,
        J::Item: IntoEntityId,
    {
        let mut grouped: BTreeMap<RevisionKind, Vec<EntityId>> = BTreeMap::new();
        for (kind, ids) in requests {
            grouped.entry(kind).or_default().extend(normalize(ids));
        }

        let mut results = BTreeMap::new();
        for (kind, ids) in grouped {
            let resolved = self.resolve_normalized(EntityKind::Revision(kind), ids).await?;
            results.extend(resolved.into_iter().filter_map(|(id, entity)| match entity {
                ResolvedEntity::Revision(r) => Some((id, r)),
                ResolvedEntity::Workflow(_) => None,
            }));
        }
        Ok(results)
    }

    /// Load one workflow; `None` (with a warning) when storage has no such row
    ///
    /// # Errors
    /// Returns error if the identifier is malformed or storage fails
    pub async fn load_workflow(&self, id: impl IntoEntityId) -> FormatterResult<Option<Arc<Workflow>>> {
        let id = id.into_entity_id()?;
        let mut results = self.load_workflows([id]).await?;
        let found = results.remove(&id);
        if found.is_none() {
            tracing::warn!(workflow = %id, "could not load workflow");
        }
        Ok(found)
    }

    /// Load one revision of `kind`; `None` (with a warning) when missing
    ///
    /// # Errors
    /// Returns error if the identifier is malformed or storage fails
    pub async fn load_revision(
        &self,
        id: impl IntoEntityId,
        kind: RevisionKind,
    ) -> FormatterResult<Option<Arc<Revision>>> {
        let id = id.into_entity_id()?;
        let mut results = self.load_revisions([(kind, [id])]).await?;
        let found = results.remove(&id);
        if found.is_none() {
            tracing::warn!(revision = %id, %kind, "could not load revision");
        }
        Ok(found)
    }

    async fn cached(&self, kind: EntityKind, id: &EntityId) -> Option<ResolvedEntity> {
        match kind {
            EntityKind::Workflow => self.cache.workflow(id).await.map(ResolvedEntity::Workflow),
            EntityKind::Revision(_) => self.cache.revision(id).await.map(ResolvedEntity::Revision),
        }
    }

    async fn resolve_normalized(
        &self,
        kind: EntityKind,
        ids: Vec<EntityId>,
    ) -> FormatterResult<BTreeMap<EntityId, ResolvedEntity>> {
        let mut results = BTreeMap::new();
        let mut missing = Vec::new();
        let mut seen = BTreeSet::new();

        for id in ids {
            if !seen.insert(id) {
                continue;
            }
            match self.cached(kind, &id).await {
                Some(hit) => {
                    results.insert(id, hit);
                }
                None => missing.push(id),
            }
        }

        if missing.is_empty() {
            tracing::debug!(%kind, hits = results.len(), "all entities cached");
            return Ok(results);
        }

        tracing::debug!(%kind, hits = results.len(), missing = missing.len(), "fetching entities");
        let fetched = self.storage.get_multi(kind, &missing).await?;
        let requested: BTreeSet<EntityId> = missing.into_iter().collect();

        for entity in fetched {
            let id = entity.id();
            if !requested.contains(&id) {
                tracing::debug!(%kind, entity = %id, "ignoring unrequested entity");
                continue;
            }
            let resolved = match (kind, entity) {
                (EntityKind::Workflow, StoredEntity::Workflow(workflow)) => {
                    let workflow = Arc::new(workflow);
                    self.cache.insert_workflow(Arc::clone(&workflow)).await;
                    ResolvedEntity::Workflow(workflow)
                }
                (EntityKind::Revision(_), StoredEntity::Revision(revision)) => {
                    let revision = Arc::new(revision);
                    self.cache.insert_revision(Arc::clone(&revision)).await;
                    ResolvedEntity::Revision(revision)
                }
                (kind, other) => {
                    tracing::warn!(%kind, actual = %other.kind(), entity = %id, "storage returned wrong entity kind");
                    continue;
                }
            };
            results.insert(id, resolved);
        }

        Ok(results)
    }
}

fn normalize<I>(ids: I) -> Vec<EntityId>
where
    I: IntoIterator,
    I::Item: IntoEntityId,
{
    ids.into_iter()
        .filter_map(|raw| match raw.into_entity_id() {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::warn!(error = %e, "skipping malformed identifier");
                None
            }
        })
        .collect()
}
