//! Entity store - keyed persistence with optimistic concurrency.
//!
//! Every record lives under a partition (one per entity kind) and carries a
//! [`ConcurrencyToken`] assigned by the store on each write. Updates must
//! present the token that was read; if another writer got there first the
//! store rejects the write with [`StoreError::ConcurrencyConflict`]. Shared
//! records such as product stock have no other protection.
//!
//! ## Example
//!
//! ```
//! use abc_orders::store::{Entity, EntitiesExt, InMemoryEntityStore};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Clone, Serialize, Deserialize)]
//! struct Shelf {
//!     id: String,
//!     items: u32,
//! }
//!
//! impl Entity for Shelf {
//!     const PARTITION: &'static str = "Shelf";
//!     fn id(&self) -> &str {
//!         &self.id
//!     }
//! }
//!
//! let store = InMemoryEntityStore::new();
//! let shelves = store.entities::<Shelf>();
//!
//! let token = shelves.put(&Shelf { id: "s1".into(), items: 3 }).unwrap();
//! let updated = shelves.update(&Shelf { id: "s1".into(), items: 2 }, token).unwrap();
//!
//! // The first token is stale now.
//! assert!(shelves.update(&Shelf { id: "s1".into(), items: 1 }, token).is_err());
//! assert_ne!(token, updated);
//! ```

mod in_memory;
mod repository;

use std::fmt;

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

pub use in_memory::InMemoryEntityStore;
pub use repository::{EntitiesExt, EntityRepository};

/// Trait for records that can be kept in an [`EntityStore`].
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync {
    /// Partition the records of this type live under ("Customer", "Order", ...).
    /// Ids only need to be unique within a partition.
    const PARTITION: &'static str;

    /// Returns the unique identifier of this record within its partition.
    fn id(&self) -> &str;
}

/// Opaque version stamp assigned by the store on every write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConcurrencyToken(u64);

impl ConcurrencyToken {
    /// Wrap a backend-specific version number.
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// The backend-specific version number.
    pub const fn as_raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConcurrencyToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "W/\"{}\"", self.0)
    }
}

/// A record together with the token it was read or written at.
#[derive(Debug, Clone)]
pub struct Versioned<T> {
    pub data: T,
    pub token: ConcurrencyToken,
}

/// Lazy, finite sequence of records returned by [`EntityStore::query`].
pub type EntityIter<'a, E> = Box<dyn Iterator<Item = Versioned<E>> + Send + 'a>;

/// Error type for entity store operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("entity not found: {partition}:{id}")]
    NotFound { partition: String, id: String },

    #[error("entity already exists: {partition}:{id}")]
    AlreadyExists { partition: String, id: String },

    /// Another writer changed the record since it was read.
    #[error("concurrency conflict on {partition}:{id} (expected {expected}, actual {actual})")]
    ConcurrencyConflict {
        partition: String,
        id: String,
        expected: ConcurrencyToken,
        actual: ConcurrencyToken,
    },

    #[error("entity serialization error: {0}")]
    Serde(String),

    /// Transport or backend failure.
    #[error("entity storage error: {0}")]
    Storage(String),
}

impl StoreError {
    /// True when the write lost an optimistic-concurrency race.
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::ConcurrencyConflict { .. })
    }
}

/// Keyed persistence with compare-and-swap writes.
///
/// Writes are never blind overwrites: `put` only creates, `update` only
/// succeeds against the current token.
pub trait EntityStore: Send + Sync {
    /// Get a record by id. Returns `None` if it does not exist.
    fn get<E: Entity>(&self, id: &str) -> Result<Option<Versioned<E>>, StoreError>;

    /// Create a new record. Fails with `AlreadyExists` if the id is taken.
    fn put<E: Entity>(&self, entity: &E) -> Result<ConcurrencyToken, StoreError>;

    /// Replace an existing record if its stored token equals `expected`.
    fn update<E: Entity>(
        &self,
        entity: &E,
        expected: ConcurrencyToken,
    ) -> Result<ConcurrencyToken, StoreError>;

    /// Records of the partition matching `predicate`, in no particular order.
    ///
    /// Every call starts a fresh sequence.
    fn query<'a, E, P>(&'a self, predicate: P) -> Result<EntityIter<'a, E>, StoreError>
    where
        E: Entity + 'a,
        P: Fn(&E) -> bool + Send + 'a;
}
