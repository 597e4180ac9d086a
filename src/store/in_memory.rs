//! InMemoryEntityStore - HashMap-backed entity store for tests and single-process use.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use super::{ConcurrencyToken, Entity, EntityIter, EntityStore, StoreError, Versioned};

/// Internal stored representation of a record.
struct StoredEntity {
    bytes: Vec<u8>,
    version: u64,
}

/// In-memory entity store backed by a HashMap.
///
/// Storage key is `"Partition:id"`. Clone-friendly via Arc; clones share
/// the same records. The write lock is held only for the compare-and-swap
/// itself, never across caller code.
#[derive(Clone)]
pub struct InMemoryEntityStore {
    storage: Arc<RwLock<HashMap<String, StoredEntity>>>,
}

impl Default for InMemoryEntityStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryEntityStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            storage: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    fn make_key(partition: &str, id: &str) -> String {
        format!("{}:{}", partition, id)
    }

    fn poisoned<T>(_: T) -> StoreError {
        StoreError::Storage("lock poisoned".into())
    }
}

impl EntityStore for InMemoryEntityStore {
    fn get<E: Entity>(&self, id: &str) -> Result<Option<Versioned<E>>, StoreError> {
        let key = Self::make_key(E::PARTITION, id);
        let storage = self.storage.read().map_err(Self::poisoned)?;

        match storage.get(&key) {
            Some(stored) => {
                let data: E = serde_json::from_slice(&stored.bytes)
                    .map_err(|e| StoreError::Serde(e.to_string()))?;
                Ok(Some(Versioned {
                    data,
                    token: ConcurrencyToken::from_raw(stored.version),
                }))
            }
            None => Ok(None),
        }
    }

    fn put<E: Entity>(&self, entity: &E) -> Result<ConcurrencyToken, StoreError> {
        let key = Self::make_key(E::PARTITION, entity.id());
        let bytes = serde_json::to_vec(entity).map_err(|e| StoreError::Serde(e.to_string()))?;

        let mut storage = self.storage.write().map_err(Self::poisoned)?;

        if storage.contains_key(&key) {
            return Err(StoreError::AlreadyExists {
                partition: E::PARTITION.to_string(),
                id: entity.id().to_string(),
            });
        }

        storage.insert(key, StoredEntity { bytes, version: 1 });

        Ok(ConcurrencyToken::from_raw(1))
    }

    fn update<E: Entity>(
        &self,
        entity: &E,
        expected: ConcurrencyToken,
    ) -> Result<ConcurrencyToken, StoreError> {
        let key = Self::make_key(E::PARTITION, entity.id());
        let bytes = serde_json::to_vec(entity).map_err(|e| StoreError::Serde(e.to_string()))?;

        let mut storage = self.storage.write().map_err(Self::poisoned)?;

        let stored = storage
            .get_mut(&key)
            .ok_or_else(|| StoreError::NotFound {
                partition: E::PARTITION.to_string(),
                id: entity.id().to_string(),
            })?;

        if stored.version != expected.as_raw() {
            return Err(StoreError::ConcurrencyConflict {
                partition: E::PARTITION.to_string(),
                id: entity.id().to_string(),
                expected,
                actual: ConcurrencyToken::from_raw(stored.version),
            });
        }

        stored.version += 1;
        stored.bytes = bytes;

        Ok(ConcurrencyToken::from_raw(stored.version))
    }

    fn query<'a, E, P>(&'a self, predicate: P) -> Result<EntityIter<'a, E>, StoreError>
    where
        E: Entity + 'a,
        P: Fn(&E) -> bool + Send + 'a,
    {
        let prefix = format!("{}:", E::PARTITION);

        // Snapshot the raw rows so decoding happens outside the lock.
        let rows: Vec<(Vec<u8>, u64)> = {
            let storage = self.storage.read().map_err(Self::poisoned)?;
            storage
                .iter()
                .filter(|(key, _)| key.starts_with(&prefix))
                .map(|(_, stored)| (stored.bytes.clone(), stored.version))
                .collect()
        };

        Ok(Box::new(rows.into_iter().filter_map(move |(bytes, version)| {
            let data = match serde_json::from_slice::<E>(&bytes) {
                Ok(data) => data,
                Err(error) => {
                    tracing::warn!(partition = E::PARTITION, %error, "skipping undecodable record");
                    return None;
                }
            };
            predicate(&data).then(|| Versioned {
                data,
                token: ConcurrencyToken::from_raw(version),
            })
        })))
    }
}
