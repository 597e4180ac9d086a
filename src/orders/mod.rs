//! Orders - the business core.
//!
//! ```text
//! ┌──────────────┐  read Customer/Product   ┌─────────────┐
//! │ OrderService │ ───────────────────────▶ │ EntityStore │
//! │              │ ◀── CAS stock decrement ─│   (tokens)  │
//! └──────┬───────┘      put Order           └─────────────┘
//!        │ after commit
//!        ▼
//! ┌────────────────┐  order-notifications / stock-updates
//! │ EventPublisher │ ─────────────────────────────────────▶ Sender
//! └────────────────┘
//! ```

pub mod events;
mod model;
mod publisher;
mod service;
mod status;

pub use events::Notification;
pub use model::{Customer, Order, Product};
pub use publisher::{EventPublisher, ORDER_CREATED_REASON};
pub use service::OrderService;
pub use status::{OrderStatus, OrderStatusMachine};
