//! Notification handlers: an in-memory order board and a log sink.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use rust_decimal::Decimal;

use super::{ConsumerError, NotificationHandler};
use crate::orders::events::{OrderCreated, OrderStatusUpdated, StockReduced};
use crate::orders::{Notification, OrderStatus};

/// One order as seen by the board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderView {
    pub order_id: String,
    pub customer_id: String,
    pub product_id: String,
    pub quantity: u32,
    pub total_amount: Decimal,
    pub status: OrderStatus,
}

#[derive(Default)]
struct BoardState {
    orders: HashMap<String, OrderView>,
    stock: HashMap<String, u32>,
}

/// Read-side view built from notifications.
///
/// Every update is idempotent, so replaying a message leaves the board as
/// it was after the first delivery. Clones share the same state.
#[derive(Clone, Default)]
pub struct OrderBoard {
    state: Arc<Mutex<BoardState>>,
}

impl OrderBoard {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, BoardState>, ConsumerError> {
        self.state
            .lock()
            .map_err(|_| ConsumerError::Handler("order board lock poisoned".into()))
    }

    pub fn order(&self, order_id: &str) -> Option<OrderView> {
        self.lock().ok()?.orders.get(order_id).cloned()
    }

    pub fn order_count(&self) -> usize {
        self.lock().map(|s| s.orders.len()).unwrap_or(0)
    }

    /// Last known stock level of a product.
    pub fn stock(&self, product_id: &str) -> Option<u32> {
        self.lock().ok()?.stock.get(product_id).copied()
    }

    fn order_created(&self, event: &OrderCreated) -> Result<(), ConsumerError> {
        self.lock()?
            .orders
            .entry(event.order_id.clone())
            .or_insert_with(|| OrderView {
                order_id: event.order_id.clone(),
                customer_id: event.customer_id.clone(),
                product_id: event.product_id.clone(),
                quantity: event.quantity,
                total_amount: event.total_amount,
                status: event.status,
            });
        Ok(())
    }

    fn stock_reduced(&self, event: &StockReduced) -> Result<(), ConsumerError> {
        // Reservations only ever lower stock, so the smallest level seen is the latest.
        self.lock()?
            .stock
            .entry(event.product_id.clone())
            .and_modify(|level| *level = (*level).min(event.new_stock))
            .or_insert(event.new_stock);
        Ok(())
    }

    fn status_updated(&self, event: &OrderStatusUpdated) -> Result<(), ConsumerError> {
        let mut state = self.lock()?;
        let view = state.orders.get_mut(&event.order_id).ok_or_else(|| {
            ConsumerError::Handler(format!("status update for unknown order {}", event.order_id))
        })?;

        if view.status == event.previous_status {
            view.status = event.new_status;
        } else {
            tracing::debug!(
                order_id = %event.order_id,
                current = %view.status,
                previous = %event.previous_status,
                new = %event.new_status,
                "status update already applied or stale"
            );
        }
        Ok(())
    }
}

impl NotificationHandler for OrderBoard {
    fn handle(&mut self, notification: &Notification) -> Result<(), ConsumerError> {
        match notification {
            Notification::OrderCreated(e) => self.order_created(e),
            Notification::StockReduced(e) => self.stock_reduced(e),
            Notification::OrderStatusUpdated(e) => self.status_updated(e),
        }
    }
}

/// Logs every notification. Used by the server binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingHandler;

impl NotificationHandler for LoggingHandler {
    fn handle(&mut self, notification: &Notification) -> Result<(), ConsumerError> {
        match notification {
            Notification::OrderCreated(e) => tracing::info!(
                order_id = %e.order_id,
                customer_id = %e.customer_id,
                quantity = e.quantity,
                total_amount = %e.total_amount,
                "OrderCreated"
            ),
            Notification::StockReduced(e) => tracing::info!(
                order_id = %e.order_id,
                product_id = %e.product_id,
                previous_stock = e.previous_stock,
                new_stock = e.new_stock,
                "StockReduced"
            ),
            Notification::OrderStatusUpdated(e) => tracing::info!(
                order_id = %e.order_id,
                from = %e.previous_status,
                to = %e.new_status,
                updated_by = %e.updated_by,
                "OrderStatusUpdated"
            ),
        }
        Ok(())
    }
}
