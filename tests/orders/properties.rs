//! Property tests for amounts and stock accounting.

use abc_orders::bus::InMemoryQueue;
use abc_orders::orders::{Order, OrderService};
use abc_orders::OrderError;
use chrono::Utc;
use proptest::prelude::*;
use rust_decimal::Decimal;

use crate::support::{customer, fast_config, product, seeded_store, stock_of};

proptest! {
    #[test]
    fn total_is_price_times_quantity(cents in 1i64..1_000_000, quantity in 1u32..500) {
        let mut kettle = product("p-1", 1_000);
        kettle.price = Decimal::new(cents, 2);

        let order = Order::place("o-1", &customer("c-1"), &kettle, quantity, Utc::now())
            .unwrap();

        prop_assert_eq!(order.unit_price(), kettle.price);
        prop_assert_eq!(order.total_amount(), Decimal::new(cents, 2) * Decimal::from(quantity));
    }

    #[test]
    fn stock_accounts_for_every_order(
        stock in 0u32..40,
        quantities in prop::collection::vec(1u32..8, 1..12),
    ) {
        let service = OrderService::new(seeded_store(stock), InMemoryQueue::new(), fast_config(5));
        let mut expected = stock;

        for quantity in quantities {
            let before = stock_of(service.store(), "p-1");
            match service.create_order("c-1", "p-1", quantity) {
                Ok(_) => {
                    prop_assert!(before >= quantity);
                    expected -= quantity;
                }
                Err(OrderError::InsufficientStock { available, requested }) => {
                    prop_assert_eq!(available, before);
                    prop_assert_eq!(requested, quantity);
                    prop_assert!(before < quantity);
                }
                Err(other) => prop_assert!(false, "unexpected error {:?}", other),
            }
            prop_assert_eq!(stock_of(service.store(), "p-1"), expected);
        }
    }
}
