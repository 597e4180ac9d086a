//! Fixtures for the order service tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

use abc_orders::bus::{Event, InMemoryQueue, PublishError, Sender};
use abc_orders::config::OrderConfig;
use abc_orders::orders::{Customer, OrderService, Product};
use abc_orders::store::{
    ConcurrencyToken, EntitiesExt, Entity, EntityIter, EntityStore, InMemoryEntityStore,
    StoreError, Versioned,
};
use abc_orders::RetryPolicy;
use rust_decimal::Decimal;

pub const ORDER_QUEUE: &str = "order-notifications";
pub const STOCK_QUEUE: &str = "stock-updates";

pub type TestService = OrderService<InMemoryEntityStore, InMemoryQueue>;

pub fn customer(id: &str) -> Customer {
    Customer {
        id: id.into(),
        name: "Lindiwe".into(),
        surname: "Dube".into(),
        username: format!("user-{id}"),
        email: format!("{id}@example.com"),
        shipping_address: "4 Kloof St, Cape Town".into(),
    }
}

pub fn product(id: &str, stock: u32) -> Product {
    Product {
        id: id.into(),
        name: "Enamel Kettle".into(),
        description: "1.5 litre".into(),
        price: Decimal::new(4500, 2),
        stock_available: stock,
        image_url: String::new(),
    }
}

/// Store holding customers `c-1`, `c-2` and product `p-1` with the given stock.
pub fn seeded_store(stock: u32) -> InMemoryEntityStore {
    let store = InMemoryEntityStore::new();
    store.entities::<Customer>().put(&customer("c-1")).unwrap();
    store.entities::<Customer>().put(&customer("c-2")).unwrap();
    store.entities::<Product>().put(&product("p-1", stock)).unwrap();
    store
}

/// Config that retries without sleeping.
pub fn fast_config(attempts: u32) -> OrderConfig {
    OrderConfig::default().with_reservation_retry(RetryPolicy::immediate(attempts))
}

pub fn service(stock: u32) -> (TestService, InMemoryQueue) {
    let queue = InMemoryQueue::new();
    let service = OrderService::new(seeded_store(stock), queue.clone(), OrderConfig::default());
    (service, queue)
}

pub fn stock_of<S: EntityStore>(store: &S, product_id: &str) -> u32 {
    store
        .entities::<Product>()
        .require(product_id)
        .unwrap()
        .data
        .stock_available
}

/// Store that loses the next `conflicts` update races on one partition.
///
/// Before delegating such an update it rewrites the current record
/// unchanged, so the caller's token is stale and the write conflicts.
pub struct ContendedStore {
    inner: InMemoryEntityStore,
    partition: &'static str,
    conflicts: AtomicU32,
    updates: AtomicU32,
}

impl ContendedStore {
    pub fn new(inner: InMemoryEntityStore, partition: &'static str, conflicts: u32) -> Self {
        Self {
            inner,
            partition,
            conflicts: AtomicU32::new(conflicts),
            updates: AtomicU32::new(0),
        }
    }

    /// Update calls made against the contended partition.
    pub fn updates(&self) -> u32 {
        self.updates.load(Ordering::SeqCst)
    }
}

impl EntityStore for ContendedStore {
    fn get<E: Entity>(&self, id: &str) -> Result<Option<Versioned<E>>, StoreError> {
        self.inner.get(id)
    }

    fn put<E: Entity>(&self, entity: &E) -> Result<ConcurrencyToken, StoreError> {
        self.inner.put(entity)
    }

    fn update<E: Entity>(
        &self,
        entity: &E,
        expected: ConcurrencyToken,
    ) -> Result<ConcurrencyToken, StoreError> {
        if E::PARTITION == self.partition {
            self.updates.fetch_add(1, Ordering::SeqCst);
            let contend = self
                .conflicts
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if contend {
                if let Some(current) = self.inner.get::<E>(entity.id())? {
                    self.inner.update(&current.data, current.token)?;
                }
            }
        }
        self.inner.update(entity, expected)
    }

    fn query<'a, E, P>(&'a self, predicate: P) -> Result<EntityIter<'a, E>, StoreError>
    where
        E: Entity + 'a,
        P: Fn(&E) -> bool + Send + 'a,
    {
        self.inner.query(predicate)
    }
}

/// Store where another buyer takes `quantity` units of a product just
/// before the first stock update lands.
pub struct RivalBuyerStore {
    inner: InMemoryEntityStore,
    quantity: u32,
    pending: AtomicU32,
}

impl RivalBuyerStore {
    pub fn new(inner: InMemoryEntityStore, quantity: u32) -> Self {
        Self {
            inner,
            quantity,
            pending: AtomicU32::new(1),
        }
    }
}

impl EntityStore for RivalBuyerStore {
    fn get<E: Entity>(&self, id: &str) -> Result<Option<Versioned<E>>, StoreError> {
        self.inner.get(id)
    }

    fn put<E: Entity>(&self, entity: &E) -> Result<ConcurrencyToken, StoreError> {
        self.inner.put(entity)
    }

    fn update<E: Entity>(
        &self,
        entity: &E,
        expected: ConcurrencyToken,
    ) -> Result<ConcurrencyToken, StoreError> {
        let rival_turn = E::PARTITION == Product::PARTITION
            && self
                .pending
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
        if rival_turn {
            let products = self.inner.entities::<Product>();
            let mut current = products.require(entity.id())?;
            current.data.stock_available -= self.quantity;
            products.update(&current.data, current.token)?;
        }
        self.inner.update(entity, expected)
    }

    fn query<'a, E, P>(&'a self, predicate: P) -> Result<EntityIter<'a, E>, StoreError>
    where
        E: Entity + 'a,
        P: Fn(&E) -> bool + Send + 'a,
    {
        self.inner.query(predicate)
    }
}

/// Sender whose queue is always unreachable.
#[derive(Default)]
pub struct FailingSender {
    attempts: AtomicUsize,
}

impl FailingSender {
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl Sender for FailingSender {
    fn send(&self, _queue: &str, _event: Event) -> Result<(), PublishError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(PublishError::ConnectionFailed("queue unreachable".into()))
    }
}
