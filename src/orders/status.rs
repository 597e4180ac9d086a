//! Order status and the transitions between them.
//!
//! ```text
//!              ┌────────────┐
//!   create ──▶ │ Submitted  │ ──────────────┐
//!              └────────────┘               │
//!                    │                      ▼
//!                    ▼               ┌────────────┐
//!              ┌────────────┐ ─────▶ │ Cancelled  │
//!              │ Processing │        └────────────┘
//!              └────────────┘
//!                    │
//!                    ▼
//!              ┌────────────┐
//!              │ Completed  │
//!              └────────────┘
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::OrderError;

/// Lifecycle state of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    Submitted,
    Processing,
    Completed,
    #[serde(alias = "Canceled")]
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 4] = [
        OrderStatus::Submitted,
        OrderStatus::Processing,
        OrderStatus::Completed,
        OrderStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Submitted => "Submitted",
            OrderStatus::Processing => "Processing",
            OrderStatus::Completed => "Completed",
            OrderStatus::Cancelled => "Cancelled",
        }
    }

    /// No transition leaves a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = OrderError;

    /// Case-insensitive; accepts "Canceled" as well as "Cancelled".
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "submitted" => Ok(OrderStatus::Submitted),
            "processing" => Ok(OrderStatus::Processing),
            "completed" => Ok(OrderStatus::Completed),
            "cancelled" | "canceled" => Ok(OrderStatus::Cancelled),
            "" => Err(OrderError::Validation("status is required".into())),
            other => Err(OrderError::Validation(format!("unknown order status: {}", other))),
        }
    }
}

/// The legal order-status transitions.
pub struct OrderStatusMachine;

impl OrderStatusMachine {
    /// Status every new order starts in.
    pub const INITIAL: OrderStatus = OrderStatus::Submitted;

    pub fn can_transition(from: OrderStatus, to: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (from, to),
            (Submitted, Processing)
                | (Submitted, Cancelled)
                | (Processing, Completed)
                | (Processing, Cancelled)
        )
    }

    /// Reject anything outside the allowed set, including self-transitions.
    pub fn validate(from: OrderStatus, to: OrderStatus) -> Result<(), OrderError> {
        if Self::can_transition(from, to) {
            Ok(())
        } else {
            Err(OrderError::IllegalTransition { from, to })
        }
    }

    /// Statuses reachable in one step from `from`.
    pub fn next_states(from: OrderStatus) -> Vec<OrderStatus> {
        OrderStatus::ALL
            .into_iter()
            .filter(|to| Self::can_transition(from, *to))
            .collect()
    }
}
