//! Customer, Product and Order records.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::status::{OrderStatus, OrderStatusMachine};
use crate::error::OrderError;
use crate::store::Entity;

/// A customer. Owned by the catalog layer; the order core only reads it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub surname: String,
    pub username: String,
    pub email: String,
    pub shipping_address: String,
}

impl Entity for Customer {
    const PARTITION: &'static str = "Customer";
    fn id(&self) -> &str {
        &self.id
    }
}

/// A product. The order core only touches `stock_available`, and only
/// through a conditional update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    pub stock_available: u32,
    #[serde(default)]
    pub image_url: String,
}

impl Product {
    /// Check the catalog invariants: a name and a positive price.
    pub fn validate(&self) -> Result<(), OrderError> {
        if self.name.trim().is_empty() {
            return Err(OrderError::Validation(format!(
                "product {} has no name",
                self.id
            )));
        }
        if self.price <= Decimal::ZERO {
            return Err(OrderError::Validation(format!(
                "product {} must have a price greater than 0",
                self.id
            )));
        }
        Ok(())
    }
}

/// `price * quantity`, or a validation error when the amount does not fit a `Decimal`.
pub fn line_total(price: Decimal, quantity: u32) -> Result<Decimal, OrderError> {
    price.checked_mul(Decimal::from(quantity)).ok_or_else(|| {
        OrderError::Validation(format!(
            "order total for {quantity} at {price} is out of range"
        ))
    })
}

impl Entity for Product {
    const PARTITION: &'static str = "Product";
    fn id(&self) -> &str {
        &self.id
    }
}

/// A placed order.
///
/// Customer, product, quantity and prices are fixed at creation and have no
/// setters; `total_amount` is always `unit_price * quantity`. Only the
/// status changes afterwards, and only along the status machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    id: String,
    customer_id: String,
    product_id: String,
    product_name: String,
    quantity: u32,
    unit_price: Decimal,
    total_amount: Decimal,
    status: OrderStatus,
    created_at_utc: DateTime<Utc>,
}

impl Order {
    /// A new `Submitted` order snapshotting the product's name and price.
    pub fn place(
        id: impl Into<String>,
        customer: &Customer,
        product: &Product,
        quantity: u32,
        created_at_utc: DateTime<Utc>,
    ) -> Result<Self, OrderError> {
        let total_amount = line_total(product.price, quantity)?;
        Ok(Self {
            id: id.into(),
            customer_id: customer.id.clone(),
            product_id: product.id.clone(),
            product_name: product.name.clone(),
            quantity,
            unit_price: product.price,
            total_amount,
            status: OrderStatusMachine::INITIAL,
            created_at_utc,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn customer_id(&self) -> &str {
        &self.customer_id
    }

    pub fn product_id(&self) -> &str {
        &self.product_id
    }

    pub fn product_name(&self) -> &str {
        &self.product_name
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn unit_price(&self) -> Decimal {
        self.unit_price
    }

    pub fn total_amount(&self) -> Decimal {
        self.total_amount
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn created_at_utc(&self) -> DateTime<Utc> {
        self.created_at_utc
    }

    /// Move to `next` if the status machine allows it. Returns the previous status.
    pub fn transition_to(&mut self, next: OrderStatus) -> Result<OrderStatus, OrderError> {
        OrderStatusMachine::validate(self.status, next)?;
        let previous = self.status;
        self.status = next;
        Ok(previous)
    }
}

impl Entity for Order {
    const PARTITION: &'static str = "Order";
    fn id(&self) -> &str {
        &self.id
    }
}
