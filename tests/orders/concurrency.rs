//! Competing writers on the same product and order.

use std::sync::Barrier;
use std::thread;

use abc_orders::bus::InMemoryQueue;
use abc_orders::orders::{Order, OrderService, OrderStatus, Product};
use abc_orders::store::Entity;
use abc_orders::OrderError;

use crate::support::{
    fast_config, seeded_store, service, stock_of, ContendedStore, RivalBuyerStore, STOCK_QUEUE,
};

#[test]
fn two_buyers_one_winner() {
    for _ in 0..20 {
        let (service, _) = service(5);
        let barrier = Barrier::new(2);

        let (service, barrier) = (&service, &barrier);

        let results: Vec<_> = thread::scope(|s| {
            let handles: Vec<_> = (0..2)
                .map(|_| {
                    s.spawn(move || {
                        barrier.wait();
                        service.create_order("c-1", "p-1", 3)
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let won = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(won, 1, "{results:?}");
        assert!(results.iter().any(|r| matches!(
            r,
            Err(OrderError::InsufficientStock {
                available: 2,
                requested: 3
            })
        )));
        assert_eq!(stock_of(service.store(), "p-1"), 2);
    }
}

#[test]
fn lost_race_rechecks_stock() {
    let store = RivalBuyerStore::new(seeded_store(5), 3);
    let queue = InMemoryQueue::new();
    let service = OrderService::new(store, queue.clone(), fast_config(5));

    let err = service.create_order("c-1", "p-1", 3).unwrap_err();

    assert_eq!(
        err,
        OrderError::InsufficientStock {
            available: 2,
            requested: 3
        }
    );
    assert_eq!(stock_of(service.store(), "p-1"), 2);
    assert!(service.list_orders().unwrap().is_empty());
    assert!(queue.is_empty(STOCK_QUEUE));
}

#[test]
fn concurrent_buyers_never_oversell() {
    const STOCK: u32 = 10;
    const BUYERS: usize = 24;

    let queue = InMemoryQueue::new();
    // Every lost race means another buyer committed, so more attempts than
    // units of stock can never run out.
    let service = OrderService::new(seeded_store(STOCK), queue.clone(), fast_config(STOCK + 1));
    let barrier = Barrier::new(BUYERS);

    let (shared, barrier) = (&service, &barrier);

    let results: Vec<Result<Order, OrderError>> = thread::scope(|s| {
        let handles: Vec<_> = (0..BUYERS)
            .map(|_| {
                s.spawn(move || {
                    barrier.wait();
                    shared.create_order("c-1", "p-1", 1)
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let placed = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(placed, STOCK as usize);
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|e| matches!(e, OrderError::InsufficientStock { available: 0, .. })));

    assert_eq!(stock_of(service.store(), "p-1"), 0);
    assert_eq!(service.list_orders().unwrap().len(), STOCK as usize);
    assert_eq!(queue.len(STOCK_QUEUE), STOCK as usize);
}

#[test]
fn lost_races_are_retried() {
    let store = ContendedStore::new(seeded_store(5), Product::PARTITION, 2);
    let service = OrderService::new(store, InMemoryQueue::new(), fast_config(5));

    service.create_order("c-1", "p-1", 3).unwrap();

    assert_eq!(service.store().updates(), 3);
    assert_eq!(stock_of(service.store(), "p-1"), 2);
}

#[test]
fn reservation_gives_up_after_ceiling() {
    let store = ContendedStore::new(seeded_store(5), Product::PARTITION, u32::MAX);
    let queue = InMemoryQueue::new();
    let service = OrderService::new(store, queue.clone(), fast_config(5));

    let err = service.create_order("c-1", "p-1", 3).unwrap_err();

    assert_eq!(
        err,
        OrderError::ReservationFailed {
            product_id: "p-1".into(),
            attempts: 5
        }
    );
    assert_eq!(err.status_code(), 409);
    assert_eq!(service.store().updates(), 5);
    assert_eq!(stock_of(service.store(), "p-1"), 5);
    assert!(service.list_orders().unwrap().is_empty());
    assert!(queue.is_empty(STOCK_QUEUE));
}

#[test]
fn backoff_policy_still_succeeds() {
    let store = ContendedStore::new(seeded_store(5), Product::PARTITION, 3);
    let service = OrderService::new(
        store,
        InMemoryQueue::new(),
        abc_orders::config::OrderConfig::default(),
    );

    service.create_order("c-1", "p-1", 1).unwrap();
    assert_eq!(stock_of(service.store(), "p-1"), 4);
}

#[test]
fn status_conflict_is_retried_once() {
    let (plain, _) = service(5);
    let order = plain.create_order("c-1", "p-1", 1).unwrap();

    let store = ContendedStore::new(plain.store().clone(), Order::PARTITION, 1);
    let service = OrderService::new(store, InMemoryQueue::new(), fast_config(5));

    let updated = service
        .update_status(order.id(), OrderStatus::Processing)
        .unwrap();
    assert_eq!(updated.status(), OrderStatus::Processing);
    assert_eq!(service.store().updates(), 2);
}

#[test]
fn second_status_conflict_surfaces() {
    let (plain, _) = service(5);
    let order = plain.create_order("c-1", "p-1", 1).unwrap();

    let store = ContendedStore::new(plain.store().clone(), Order::PARTITION, 2);
    let queue = InMemoryQueue::new();
    let service = OrderService::new(store, queue.clone(), fast_config(5));

    let err = service
        .update_status(order.id(), OrderStatus::Processing)
        .unwrap_err();

    assert_eq!(err.code(), "concurrency_conflict");
    assert_eq!(err.status_code(), 409);
    assert_eq!(
        service.get_order(order.id()).unwrap().status(),
        OrderStatus::Submitted
    );
    assert!(queue.is_empty("order-notifications"));
}
