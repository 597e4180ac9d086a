use thiserror::Error;

use crate::bus::PublishError;
use crate::orders::OrderStatus;
use crate::store::StoreError;

/// Errors surfaced by the order service.
///
/// Every variant maps to a stable [`code`](OrderError::code) and an
/// HTTP-style [`status_code`](OrderError::status_code). `Internal` carries
/// backend detail for logs; callers facing users should show
/// [`public_message`](OrderError::public_message) instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    /// Malformed or missing input.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The request names a customer or product that does not exist.
    #[error("invalid {entity} reference: {id}")]
    InvalidReference { entity: &'static str, id: String },

    #[error("insufficient stock: requested {requested}, available {available}")]
    InsufficientStock { available: u32, requested: u32 },

    /// Stock reservation kept losing races until the attempt ceiling.
    #[error("stock reservation for product {product_id} failed after {attempts} attempts")]
    ReservationFailed { product_id: String, attempts: u32 },

    /// A write lost its optimistic-concurrency race and was not retried further.
    #[error("concurrent update conflict on {id}")]
    ConcurrencyConflict { id: String },

    #[error("illegal status transition from {from} to {to}")]
    IllegalTransition { from: OrderStatus, to: OrderStatus },

    #[error("order not found: {0}")]
    NotFound(String),

    /// Store or bus transport failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl OrderError {
    /// Stable machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            OrderError::Validation(_) => "validation_error",
            OrderError::InvalidReference { .. } => "invalid_reference",
            OrderError::InsufficientStock { .. } => "insufficient_stock",
            OrderError::ReservationFailed { .. } => "reservation_failed",
            OrderError::ConcurrencyConflict { .. } => "concurrency_conflict",
            OrderError::IllegalTransition { .. } => "illegal_transition",
            OrderError::NotFound(_) => "not_found",
            OrderError::Internal(_) => "internal_error",
        }
    }

    /// Map this error to an HTTP-style status code.
    pub fn status_code(&self) -> u16 {
        match self {
            OrderError::Validation(_) => 400,
            OrderError::InvalidReference { .. } => 400,
            OrderError::InsufficientStock { .. } => 409,
            OrderError::ReservationFailed { .. } => 409,
            OrderError::ConcurrencyConflict { .. } => 409,
            OrderError::IllegalTransition { .. } => 400,
            OrderError::NotFound(_) => 404,
            OrderError::Internal(_) => 500,
        }
    }

    /// Human-readable message that is safe to show to callers.
    pub fn public_message(&self) -> String {
        match self {
            OrderError::Internal(_) => "internal error".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<StoreError> for OrderError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::ConcurrencyConflict { partition, id, .. } => {
                OrderError::ConcurrencyConflict {
                    id: format!("{}:{}", partition, id),
                }
            }
            other => OrderError::Internal(other.to_string()),
        }
    }
}

impl From<PublishError> for OrderError {
    fn from(err: PublishError) -> Self {
        OrderError::Internal(err.to_string())
    }
}
