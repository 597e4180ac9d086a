//! OrderService - order placement, stock reservation and status changes.

use std::thread;

use chrono::Utc;
use uuid::Uuid;

use super::model::{line_total, Customer, Order, Product};
use super::publisher::EventPublisher;
use super::status::OrderStatus;
use crate::bus::Sender;
use crate::config::OrderConfig;
use crate::error::OrderError;
use crate::store::{EntitiesExt, Entity, EntityStore, Versioned};

/// Outcome of a committed stock decrement.
#[derive(Debug, Clone)]
struct Reservation {
    /// Product as written, with the reduced stock
    product: Product,
    previous_stock: u32,
}

/// The only component with business rules.
///
/// Holds no lock of its own: concurrent calls are safe because every write
/// to a shared record goes through the store's compare-and-swap.
///
/// ## Example
///
/// ```
/// use abc_orders::bus::InMemoryQueue;
/// use abc_orders::config::OrderConfig;
/// use abc_orders::orders::{Customer, OrderService, OrderStatus, Product};
/// use abc_orders::store::{EntitiesExt, InMemoryEntityStore};
/// use rust_decimal::Decimal;
///
/// let store = InMemoryEntityStore::new();
/// store.entities::<Customer>().put(&Customer {
///     id: "c-1".into(),
///     name: "Ana".into(),
///     surname: "Silva".into(),
///     username: "ana".into(),
///     email: "ana@example.com".into(),
///     shipping_address: "Rua 1".into(),
/// }).unwrap();
/// store.entities::<Product>().put(&Product {
///     id: "p-1".into(),
///     name: "Kettle".into(),
///     description: String::new(),
///     price: Decimal::new(4500, 2),
///     stock_available: 5,
///     image_url: String::new(),
/// }).unwrap();
///
/// let service = OrderService::new(store, InMemoryQueue::new(), OrderConfig::default());
/// let order = service.create_order("c-1", "p-1", 3).unwrap();
/// assert_eq!(order.total_amount(), Decimal::new(13500, 2));
///
/// let order = service.update_status(order.id(), OrderStatus::Processing).unwrap();
/// assert_eq!(order.status(), OrderStatus::Processing);
/// ```
pub struct OrderService<S, P> {
    store: S,
    events: EventPublisher<P>,
    config: OrderConfig,
}

impl<S: EntityStore, P: Sender> OrderService<S, P> {
    pub fn new(store: S, sender: P, config: OrderConfig) -> Self {
        Self {
            store,
            events: EventPublisher::new(sender, &config),
            config,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn events(&self) -> &EventPublisher<P> {
        &self.events
    }

    pub fn config(&self) -> &OrderConfig {
        &self.config
    }

    /// Place an order and reserve its stock.
    ///
    /// Once the stock decrement is committed there is no compensation: a
    /// later failure to store the order surfaces as `Internal`, and a failed
    /// notification is only logged.
    #[tracing::instrument(skip(self), fields(order_id = tracing::field::Empty))]
    pub fn create_order(
        &self,
        customer_id: &str,
        product_id: &str,
        quantity: u32,
    ) -> Result<Order, OrderError> {
        if quantity < 1 {
            return Err(OrderError::Validation(
                "quantity must be at least 1".into(),
            ));
        }
        require_id("customerId", customer_id)?;
        require_id("productId", product_id)?;

        let customer = self
            .store
            .entities::<Customer>()
            .get(customer_id)?
            .ok_or_else(|| OrderError::InvalidReference {
                entity: "customer",
                id: customer_id.to_string(),
            })?
            .data;

        let reservation = self.reserve_stock(product_id, quantity)?;

        let order = Order::place(
            Uuid::new_v4().to_string(),
            &customer,
            &reservation.product,
            quantity,
            Utc::now(),
        )?;
        tracing::Span::current().record("order_id", order.id());

        if let Err(error) = self.store.entities::<Order>().put(&order) {
            tracing::error!(
                product_id,
                quantity,
                %error,
                "stock reserved but order could not be stored"
            );
            return Err(error.into());
        }

        tracing::info!(
            product_id,
            quantity,
            stock_available = reservation.product.stock_available,
            "order created"
        );

        self.events.order_created(&order);
        self.events
            .stock_reduced(&reservation.product, reservation.previous_stock, &order);

        Ok(order)
    }

    /// Conditionally decrement stock, re-reading and re-checking on every
    /// conflict until the retry policy runs out.
    fn reserve_stock(&self, product_id: &str, quantity: u32) -> Result<Reservation, OrderError> {
        let products = self.store.entities::<Product>();
        let policy = &self.config.reservation_retry;
        let mut attempt = 0;

        loop {
            attempt += 1;

            let Versioned {
                data: mut product,
                token,
            } = products
                .get(product_id)?
                .ok_or_else(|| OrderError::InvalidReference {
                    entity: "product",
                    id: product_id.to_string(),
                })?;

            let previous_stock = product.stock_available;
            let remaining = previous_stock.checked_sub(quantity);
            product.stock_available = remaining.ok_or(OrderError::InsufficientStock {
                available: previous_stock,
                requested: quantity,
            })?;
            line_total(product.price, quantity)?;

            match products.update(&product, token) {
                Ok(_) => {
                    return Ok(Reservation {
                        product,
                        previous_stock,
                    })
                }
                Err(e) if e.is_conflict() => {
                    if attempt >= policy.max_attempts {
                        tracing::warn!(product_id, attempt, "stock reservation gave up");
                        return Err(OrderError::ReservationFailed {
                            product_id: product_id.to_string(),
                            attempts: attempt,
                        });
                    }

                    let delay = policy.delay_for_attempt(attempt);
                    tracing::debug!(
                        product_id,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "stock reservation conflict, retrying"
                    );
                    if !delay.is_zero() {
                        thread::sleep(delay);
                    }
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Move an order along the status machine.
    ///
    /// A conflicting write is retried with a fresh read, so the transition
    /// is validated again against whatever the competing writer stored.
    #[tracing::instrument(skip(self))]
    pub fn update_status(
        &self,
        order_id: &str,
        new_status: OrderStatus,
    ) -> Result<Order, OrderError> {
        let orders = self.store.entities::<Order>();

        for attempt in 1..=self.config.status_update_attempts.max(1) {
            let Versioned {
                data: mut order,
                token,
            } = orders
                .get(order_id)?
                .ok_or_else(|| OrderError::NotFound(order_id.to_string()))?;

            let previous = order.transition_to(new_status)?;

            match orders.update(&order, token) {
                Ok(_) => {
                    tracing::info!(from = %previous, to = %new_status, "order status updated");
                    self.events
                        .status_updated(order.id(), previous, new_status, Utc::now());
                    return Ok(order);
                }
                Err(e) if e.is_conflict() => {
                    tracing::debug!(attempt, "status update conflict");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(OrderError::ConcurrencyConflict {
            id: format!("{}:{}", Order::PARTITION, order_id),
        })
    }

    /// Get one order.
    pub fn get_order(&self, order_id: &str) -> Result<Order, OrderError> {
        self.store
            .entities::<Order>()
            .get(order_id)?
            .map(|v| v.data)
            .ok_or_else(|| OrderError::NotFound(order_id.to_string()))
    }

    /// Every order, newest first.
    pub fn list_orders(&self) -> Result<Vec<Order>, OrderError> {
        let orders = self.store.entities::<Order>().all()?;
        Ok(newest_first(orders.map(|v| v.data).collect()))
    }

    /// A customer's orders, newest first. Unknown customers simply have none.
    pub fn orders_by_customer(&self, customer_id: &str) -> Result<Vec<Order>, OrderError> {
        require_id("customerId", customer_id)?;

        let wanted = customer_id.to_string();
        let orders = self
            .store
            .entities::<Order>()
            .query(move |o: &Order| o.customer_id() == wanted)?;
        Ok(newest_first(orders.map(|v| v.data).collect()))
    }
}

fn require_id(field: &str, value: &str) -> Result<(), OrderError> {
    if value.trim().is_empty() {
        return Err(OrderError::Validation(format!("{} is required", field)));
    }
    Ok(())
}

fn newest_first(mut orders: Vec<Order>) -> Vec<Order> {
    orders.sort_by(|a, b| {
        b.created_at_utc()
            .cmp(&a.created_at_utc())
            .then_with(|| a.id().cmp(b.id()))
    });
    orders
}
