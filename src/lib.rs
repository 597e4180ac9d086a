//! Order placement and inventory consistency for a retail backend.
//!
//! - [`store`] keeps customers, products and orders behind optimistic
//!   concurrency tokens.
//! - [`orders`] holds the business rules: stock reservation, the status
//!   machine and the notifications emitted after each commit.
//! - [`bus`] and [`consumer`] move those notifications through named queues
//!   with at-least-once delivery.
//! - [`http`] (feature `http`) exposes the service over axum.

pub mod bus;
pub mod catalog;
pub mod config;
pub mod consumer;
mod error;
pub mod orders;
mod retry;
pub mod store;

#[cfg(feature = "http")]
pub mod http;

pub use error::OrderError;
pub use retry::RetryPolicy;
