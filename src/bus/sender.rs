//! Sender trait for point-to-point messaging.

use std::sync::Arc;

use super::message::{Event, PublishError};

/// Trait for sending messages to a named queue (point-to-point).
///
/// `Ok(())` means the message is durably enqueued. A consumer may still see
/// it more than once. An error means it was not enqueued; retrying or
/// dropping it is the caller's decision.
pub trait Sender: Send + Sync {
    /// Send a message to a named queue.
    fn send(&self, queue: &str, event: Event) -> Result<(), PublishError>;
}

impl<T: Sender + ?Sized> Sender for Arc<T> {
    fn send(&self, queue: &str, event: Event) -> Result<(), PublishError> {
        (**self).send(queue, event)
    }
}
