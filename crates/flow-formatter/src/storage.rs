//! Storage collaborator contract

use crate::error::StorageError;
use async_trait::async_trait;
use dashmap::DashMap;
use flow_model::{EntityId, EntityKind, StoredEntity};

/// Multi-get access to persisted entities
///
/// # Contract
/// - May return fewer entities than requested; missing or deleted rows are
///   dropped silently
/// - A partially missing batch is not an error
#[async_trait]
pub trait Storage: Send + Sync {
    /// Fetch all entities of `kind` with the given identifiers
    async fn get_multi(
        &self,
        kind: EntityKind,
        ids: &[EntityId],
    ) -> Result<Vec<StoredEntity>, StorageError>;
}

/// Storage backed by an in-memory map
///
/// Used for entity dumps and tests.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entities: DashMap<EntityId, StoredEntity>,
}

impl MemoryStorage {
    /// Create empty storage
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an entity
    pub fn insert(&self, entity: impl Into<StoredEntity>) {
        let entity = entity.into();
        self.entities.insert(entity.id(), entity);
    }

    /// Number of stored entities
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Check if storage is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

impl FromIterator<StoredEntity> for MemoryStorage {
    fn from_iter<T: IntoIterator<Item = StoredEntity>>(iter: T) -> Self {
        let storage = Self::new();
        for entity in iter {
            storage.insert(entity);
        }
        storage
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn get_multi(
        &self,
        kind: EntityKind,
        ids: &[EntityId],
    ) -> Result<Vec<StoredEntity>, StorageError> {
        Ok(ids
            .iter()
            .filter_map(|id| self.entities.get(id))
            .filter(|entry| entry.kind() == kind)
            .map(|entry| entry.value().clone())
            .collect())
    }
}
