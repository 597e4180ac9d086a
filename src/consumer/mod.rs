//! Queue consumers for order notifications.
//!
//! A [`QueueConsumer`] pulls one message at a time from a [`Listener`],
//! decodes the [`Notification`] envelope and hands it to a
//! [`NotificationHandler`]. The contract is process-then-acknowledge:
//!
//! - handled successfully → `ack`
//! - already handled (same dedupe key) → `ack` without calling the handler
//! - handler failed → `nack`, the queue redelivers it
//! - body cannot be decoded → left unacknowledged; it reappears when its
//!   visibility timeout expires
//!
//! [`ConsumerThread`] runs a consumer on a background thread.

mod projection;
mod worker;

use std::collections::{HashSet, VecDeque};

use thiserror::Error;

use crate::bus::{Event, Listener, PublishError};
use crate::orders::Notification;

pub use projection::{LoggingHandler, OrderBoard, OrderView};
pub use worker::{ConsumerStats, ConsumerThread};

#[derive(Debug, Error)]
pub enum ConsumerError {
    #[error("undecodable message {event_id}: {reason}")]
    Decode { event_id: String, reason: String },

    #[error("handler failed: {0}")]
    Handler(String),

    #[error(transparent)]
    Transport(#[from] PublishError),
}

/// Something that reacts to order notifications.
///
/// Delivery is at-least-once; [`QueueConsumer`] filters exact duplicates
/// but handlers should still tolerate seeing a fact twice.
pub trait NotificationHandler: Send {
    fn handle(&mut self, notification: &Notification) -> Result<(), ConsumerError>;
}

impl<F> NotificationHandler for F
where
    F: FnMut(&Notification) -> Result<(), ConsumerError> + Send,
{
    fn handle(&mut self, notification: &Notification) -> Result<(), ConsumerError> {
        self(notification)
    }
}

/// What a single [`QueueConsumer::process_next`] call did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsumeOutcome {
    /// Nothing was visible within the wait.
    Idle,
    /// Handled and acknowledged.
    Processed { dedupe_key: String },
    /// Seen before; acknowledged without handling.
    Duplicate { dedupe_key: String },
    /// Not acknowledged; will be delivered again.
    Retained { event_id: String, reason: String },
}

/// Dedupe keys remembered by a consumer before the oldest are forgotten.
pub const DEFAULT_DEDUPE_CAPACITY: usize = 10_000;

/// The most recent dedupe keys, oldest evicted first.
#[derive(Debug)]
struct DedupeWindow {
    capacity: usize,
    keys: HashSet<String>,
    order: VecDeque<String>,
}

impl DedupeWindow {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            keys: HashSet::new(),
            order: VecDeque::new(),
        }
    }

    fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    fn remember(&mut self, key: String) {
        if self.capacity == 0 || !self.keys.insert(key.clone()) {
            return;
        }
        self.order.push_back(key);
        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.keys.remove(&oldest);
            }
        }
    }

    fn len(&self) -> usize {
        self.order.len()
    }
}

/// Pulls, decodes, dispatches and acknowledges messages from one queue.
pub struct QueueConsumer<L, H> {
    listener: L,
    queue: String,
    handler: H,
    wait_ms: u64,
    seen: DedupeWindow,
}

impl<L: Listener, H: NotificationHandler> QueueConsumer<L, H> {
    pub fn new(listener: L, queue: impl Into<String>, handler: H) -> Self {
        Self {
            listener,
            queue: queue.into(),
            handler,
            wait_ms: 100,
            seen: DedupeWindow::new(DEFAULT_DEDUPE_CAPACITY),
        }
    }

    /// How long `process_next` waits for a visible message.
    pub fn with_wait_ms(mut self, wait_ms: u64) -> Self {
        self.wait_ms = wait_ms;
        self
    }

    /// How many recent dedupe keys to remember. Zero turns deduplication off.
    pub fn with_dedupe_capacity(mut self, capacity: usize) -> Self {
        self.seen = DedupeWindow::new(capacity);
        self
    }

    /// Dedupe keys currently remembered.
    pub fn remembered(&self) -> usize {
        self.seen.len()
    }

    pub fn queue(&self) -> &str {
        &self.queue
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// Receive and process at most one message.
    ///
    /// Errors are transport failures only; handler and decode failures are
    /// reported as [`ConsumeOutcome::Retained`].
    pub fn process_next(&mut self) -> Result<ConsumeOutcome, ConsumerError> {
        let event = match self.listener.listen(&self.queue, self.wait_ms)? {
            Some(event) => event,
            None => return Ok(ConsumeOutcome::Idle),
        };

        let notification = match decode(&event) {
            Ok(notification) => notification,
            Err(error) => {
                tracing::warn!(queue = %self.queue, event_id = %event.id, %error, "leaving undecodable message");
                return Ok(ConsumeOutcome::Retained {
                    event_id: event.id,
                    reason: error.to_string(),
                });
            }
        };

        let dedupe_key = notification.dedupe_key();
        if self.seen.contains(&dedupe_key) {
            tracing::debug!(queue = %self.queue, %dedupe_key, "duplicate delivery");
            self.listener.ack(&self.queue, &event.id)?;
            return Ok(ConsumeOutcome::Duplicate { dedupe_key });
        }

        match self.handler.handle(&notification) {
            Ok(()) => {
                self.listener.ack(&self.queue, &event.id)?;
                self.seen.remember(dedupe_key.clone());
                Ok(ConsumeOutcome::Processed { dedupe_key })
            }
            Err(error) => {
                let reason = error.to_string();
                tracing::warn!(queue = %self.queue, event_id = %event.id, %reason, "handler failed, releasing message");
                self.listener.nack(&self.queue, &event.id, &reason)?;
                Ok(ConsumeOutcome::Retained {
                    event_id: event.id,
                    reason,
                })
            }
        }
    }

    /// Process until the queue has nothing visible. Returns the outcomes.
    pub fn drain(&mut self) -> Result<Vec<ConsumeOutcome>, ConsumerError> {
        let mut outcomes = Vec::new();
        loop {
            match self.process_next()? {
                ConsumeOutcome::Idle => return Ok(outcomes),
                outcome => outcomes.push(outcome),
            }
        }
    }
}

fn decode(event: &Event) -> Result<Notification, ConsumerError> {
    event.decode().map_err(|e| ConsumerError::Decode {
        event_id: event.id.clone(),
        reason: e.to_string(),
    })
}
