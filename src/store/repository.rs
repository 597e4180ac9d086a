//! EntityRepository - Typed accessor for one partition of a store.

use std::marker::PhantomData;

use super::{ConcurrencyToken, Entity, EntityIter, EntityStore, StoreError, Versioned};

/// Typed wrapper for accessing records of a specific entity type.
pub struct EntityRepository<'a, S, E> {
    store: &'a S,
    _marker: PhantomData<E>,
}

impl<'a, S, E> EntityRepository<'a, S, E> {
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            _marker: PhantomData,
        }
    }
}

impl<'a, S: EntityStore, E: Entity + 'a> EntityRepository<'a, S, E> {
    /// Get a record by id.
    pub fn get(&self, id: &str) -> Result<Option<Versioned<E>>, StoreError> {
        self.store.get(id)
    }

    /// Get a record by id, treating absence as `StoreError::NotFound`.
    pub fn require(&self, id: &str) -> Result<Versioned<E>, StoreError> {
        self.store.get(id)?.ok_or_else(|| StoreError::NotFound {
            partition: E::PARTITION.to_string(),
            id: id.to_string(),
        })
    }

    /// Create a new record. Fails if it already exists.
    pub fn put(&self, entity: &E) -> Result<ConcurrencyToken, StoreError> {
        self.store.put(entity)
    }

    /// Update an existing record with optimistic concurrency.
    pub fn update(
        &self,
        entity: &E,
        expected: ConcurrencyToken,
    ) -> Result<ConcurrencyToken, StoreError> {
        self.store.update(entity, expected)
    }

    /// Records matching a predicate.
    pub fn query<P>(&self, predicate: P) -> Result<EntityIter<'a, E>, StoreError>
    where
        P: Fn(&E) -> bool + Send + 'a,
    {
        self.store.query(predicate)
    }

    /// Every record of the partition.
    pub fn all(&self) -> Result<EntityIter<'a, E>, StoreError> {
        self.store.query(|_: &E| true)
    }
}

/// Extension trait for typed entity access on any EntityStore.
pub trait EntitiesExt: EntityStore + Sized {
    /// Get a typed entity repository.
    fn entities<E: Entity>(&self) -> EntityRepository<'_, Self, E> {
        EntityRepository::new(self)
    }
}

impl<S: EntityStore> EntitiesExt for S {}
