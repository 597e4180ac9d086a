//! Notifications emitted by the order core.
//!
//! Message bodies are JSON objects with a `type` discriminator:
//!
//! ```json
//! { "type": "StockReduced", "productId": "p-1", "productName": "Tea",
//!   "previousStock": 5, "newStock": 2, "change": -3,
//!   "reason": "OrderCreated", "orderId": "..." }
//! ```

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::model::Order;
use super::status::OrderStatus;

/// Default queue for `OrderCreated` and `OrderStatusUpdated`.
pub const ORDER_NOTIFICATIONS: &str = "order-notifications";

/// Default queue for `StockReduced`.
pub const STOCK_UPDATES: &str = "stock-updates";

/// Actor recorded on status changes made by the service itself.
pub const SYSTEM_ACTOR: &str = "System";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCreated {
    pub order_id: String,
    pub customer_id: String,
    pub product_id: String,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub total_amount: Decimal,
    pub status: OrderStatus,
    pub created_at_utc: DateTime<Utc>,
}

impl From<&Order> for OrderCreated {
    fn from(order: &Order) -> Self {
        Self {
            order_id: order.id().to_string(),
            customer_id: order.customer_id().to_string(),
            product_id: order.product_id().to_string(),
            product_name: order.product_name().to_string(),
            quantity: order.quantity(),
            unit_price: order.unit_price(),
            total_amount: order.total_amount(),
            status: order.status(),
            created_at_utc: order.created_at_utc(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockReduced {
    pub product_id: String,
    pub product_name: String,
    pub previous_stock: u32,
    pub new_stock: u32,
    /// Signed stock delta; negative for a reservation.
    pub change: i64,
    pub reason: String,
    pub order_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderStatusUpdated {
    pub order_id: String,
    pub previous_status: OrderStatus,
    pub new_status: OrderStatus,
    pub updated_at_utc: DateTime<Utc>,
    #[serde(default = "system_actor")]
    pub updated_by: String,
}

fn system_actor() -> String {
    SYSTEM_ACTOR.to_string()
}

/// Every message body the order core puts on a queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Notification {
    OrderCreated(OrderCreated),
    StockReduced(StockReduced),
    OrderStatusUpdated(OrderStatusUpdated),
}

impl Notification {
    pub fn event_type(&self) -> &'static str {
        match self {
            Notification::OrderCreated(_) => "OrderCreated",
            Notification::StockReduced(_) => "StockReduced",
            Notification::OrderStatusUpdated(_) => "OrderStatusUpdated",
        }
    }

    pub fn order_id(&self) -> &str {
        match self {
            Notification::OrderCreated(e) => &e.order_id,
            Notification::StockReduced(e) => &e.order_id,
            Notification::OrderStatusUpdated(e) => &e.order_id,
        }
    }

    /// Identity of the business fact carried by this message.
    ///
    /// Two deliveries with the same key describe the same change. Status
    /// updates include the target status: an order reaches each status at
    /// most once, so `orderId + type + newStatus` is unique per change.
    pub fn dedupe_key(&self) -> String {
        match self {
            Notification::OrderStatusUpdated(e) => {
                format!("{}:{}:{}", e.order_id, self.event_type(), e.new_status)
            }
            _ => format!("{}:{}", self.order_id(), self.event_type()),
        }
    }
}
