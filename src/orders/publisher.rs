//! EventPublisher - typed notifications over a bus `Sender`.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::events::{Notification, OrderCreated, OrderStatusUpdated, StockReduced, SYSTEM_ACTOR};
use super::model::{Order, Product};
use super::status::OrderStatus;
use crate::bus::{Event, PublishError, Sender};
use crate::config::OrderConfig;

/// Reason recorded on stock reductions caused by order placement.
pub const ORDER_CREATED_REASON: &str = "OrderCreated";

/// Publishes order notifications to the configured queues.
///
/// [`publish`](EventPublisher::publish) reports failures. The `order_created`,
/// `stock_reduced` and `status_updated` helpers are best effort: they run
/// after the state change is already committed, so a failed send is logged
/// and reported as `false`, never turned into an error for the caller.
pub struct EventPublisher<P> {
    sender: P,
    order_queue: String,
    stock_queue: String,
}

impl<P: Sender> EventPublisher<P> {
    pub fn new(sender: P, config: &OrderConfig) -> Self {
        Self {
            sender,
            order_queue: config.order_notifications_queue.clone(),
            stock_queue: config.stock_updates_queue.clone(),
        }
    }

    pub fn sender(&self) -> &P {
        &self.sender
    }

    /// Queue a notification. The message gets a fresh id; the body carries
    /// the `type` tag and the order id is copied into the metadata.
    pub fn publish(&self, queue: &str, notification: &Notification) -> Result<(), PublishError> {
        let event = Event::json(
            Uuid::new_v4().to_string(),
            notification.event_type(),
            notification,
        )?
        .with_metadata("order-id", notification.order_id());

        self.sender.send(queue, event)
    }

    /// Announce a newly placed order on the order queue.
    pub fn order_created(&self, order: &Order) -> bool {
        let notification = Notification::OrderCreated(OrderCreated::from(order));
        self.best_effort(&self.order_queue, &notification)
    }

    /// Announce a stock reservation on the stock queue.
    pub fn stock_reduced(&self, product: &Product, previous_stock: u32, order: &Order) -> bool {
        let notification = Notification::StockReduced(StockReduced {
            product_id: product.id.clone(),
            product_name: product.name.clone(),
            previous_stock,
            new_stock: product.stock_available,
            change: i64::from(product.stock_available) - i64::from(previous_stock),
            reason: ORDER_CREATED_REASON.to_string(),
            order_id: order.id().to_string(),
        });
        self.best_effort(&self.stock_queue, &notification)
    }

    /// Announce a committed status change on the order queue.
    pub fn status_updated(
        &self,
        order_id: &str,
        previous_status: OrderStatus,
        new_status: OrderStatus,
        updated_at_utc: DateTime<Utc>,
    ) -> bool {
        let notification = Notification::OrderStatusUpdated(OrderStatusUpdated {
            order_id: order_id.to_string(),
            previous_status,
            new_status,
            updated_at_utc,
            updated_by: SYSTEM_ACTOR.to_string(),
        });
        self.best_effort(&self.order_queue, &notification)
    }

    fn best_effort(&self, queue: &str, notification: &Notification) -> bool {
        match self.publish(queue, notification) {
            Ok(()) => {
                tracing::debug!(
                    queue,
                    event_type = notification.event_type(),
                    order_id = notification.order_id(),
                    "notification queued"
                );
                true
            }
            Err(error) => {
                tracing::warn!(
                    queue,
                    event_type = notification.event_type(),
                    order_id = notification.order_id(),
                    %error,
                    "failed to publish notification"
                );
                false
            }
        }
    }
}
