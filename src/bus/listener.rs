//! Listener trait for point-to-point messaging.

use super::message::{Event, PublishError};

/// Trait for consuming a named queue (point-to-point) with at-least-once
/// delivery.
///
/// A received message stays on the queue until it is acknowledged. Listeners
/// on the same queue compete: while one holds a message it is hidden from
/// the others, and it becomes visible again if it is never acked.
pub trait Listener: Send + Sync {
    /// Receive the next visible message on a named queue, blocking until
    /// one is available or the timeout expires.
    fn listen(&self, queue: &str, timeout_ms: u64) -> Result<Option<Event>, PublishError>;

    /// Remove a processed message from the queue.
    fn ack(&self, queue: &str, event_id: &str) -> Result<(), PublishError>;

    /// Give a message back for redelivery.
    fn nack(&self, queue: &str, event_id: &str, reason: &str) -> Result<(), PublishError>;
}
