//! In-memory queue for testing and single-process scenarios.
//!
//! Behaves like a storage queue with a visibility timeout: a received
//! message is hidden for a lease instead of being removed, and it only
//! leaves the queue when the consumer acknowledges it. A consumer that
//! crashes or fails leaves the message to be redelivered.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use super::{Event, Listener, PublishError, Sender};

/// A message sitting on a named queue.
struct Envelope {
    event: Event,
    visible_at: Instant,
    dequeue_count: u32,
}

type Queues = HashMap<String, VecDeque<Envelope>>;

/// In-memory queue implementing both `Sender` and `Listener`.
///
/// Thread-safe and clone-friendly: clones share the same named queues.
///
/// ## Example
///
/// ```
/// use abc_orders::bus::{Event, InMemoryQueue, Listener, Sender};
///
/// let queue = InMemoryQueue::new();
/// queue
///     .send("orders", Event::with_string_payload("evt-1", "OrderCreated", "{}"))
///     .unwrap();
///
/// let event = queue.listen("orders", 100).unwrap().unwrap();
/// assert_eq!(event.event_type, "OrderCreated");
///
/// // Still on the queue until acknowledged.
/// assert_eq!(queue.len("orders"), 1);
/// queue.ack("orders", &event.id).unwrap();
/// assert!(queue.is_empty("orders"));
/// ```
#[derive(Clone)]
pub struct InMemoryQueue {
    queues: Arc<Mutex<Queues>>,
    visibility_timeout: Duration,
}

impl Default for InMemoryQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryQueue {
    /// Create a new in-memory queue with a 30 second visibility timeout.
    pub fn new() -> Self {
        Self {
            queues: Arc::new(Mutex::new(HashMap::new())),
            visibility_timeout: Duration::from_secs(30),
        }
    }

    /// Set how long a received message stays hidden before redelivery.
    pub fn with_visibility_timeout(mut self, timeout: Duration) -> Self {
        self.visibility_timeout = timeout;
        self
    }

    /// Inspection helpers never fail on a poisoned lock.
    fn inspect(&self) -> MutexGuard<'_, Queues> {
        self.queues.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn guard(&self) -> Result<MutexGuard<'_, Queues>, PublishError> {
        self.queues
            .lock()
            .map_err(|_| PublishError::ConnectionFailed("queue lock poisoned".into()))
    }

    /// All messages on a queue, visible or not, oldest first.
    pub fn messages(&self, queue: &str) -> Vec<Event> {
        self.inspect()
            .get(queue)
            .map(|q| q.iter().map(|e| e.event.clone()).collect())
            .unwrap_or_default()
    }

    /// Event types on a queue, oldest first.
    pub fn event_types(&self, queue: &str) -> Vec<String> {
        self.messages(queue)
            .into_iter()
            .map(|e| e.event_type)
            .collect()
    }

    /// Find the first message of a type on a queue.
    pub fn find_by_type(&self, queue: &str, event_type: &str) -> Option<Event> {
        self.messages(queue)
            .into_iter()
            .find(|e| e.event_type == event_type)
    }

    /// Number of messages still on a queue (including in-flight ones).
    pub fn len(&self, queue: &str) -> usize {
        self.inspect().get(queue).map_or(0, VecDeque::len)
    }

    /// Check if a queue holds no messages.
    pub fn is_empty(&self, queue: &str) -> bool {
        self.len(queue) == 0
    }

    /// How many times a message has been handed out.
    pub fn dequeue_count(&self, queue: &str, event_id: &str) -> Option<u32> {
        self.inspect()
            .get(queue)?
            .iter()
            .find(|e| e.event.id == event_id)
            .map(|e| e.dequeue_count)
    }

    /// Remove every queue and message.
    pub fn clear(&self) {
        self.inspect().clear();
    }
}

impl Sender for InMemoryQueue {
    fn send(&self, queue: &str, event: Event) -> Result<(), PublishError> {
        self.guard()?
            .entry(queue.to_string())
            .or_default()
            .push_back(Envelope {
                event,
                visible_at: Instant::now(),
                dequeue_count: 0,
            });
        Ok(())
    }
}

impl Listener for InMemoryQueue {
    fn listen(&self, queue: &str, timeout_ms: u64) -> Result<Option<Event>, PublishError> {
        // No deadline when the wait is too long to represent.
        let deadline = Instant::now().checked_add(Duration::from_millis(timeout_ms));

        loop {
            {
                let mut queues = self.guard()?;
                let now = Instant::now();
                let next = queues
                    .get_mut(queue)
                    .and_then(|q| q.iter_mut().find(|e| e.visible_at <= now));

                if let Some(envelope) = next {
                    envelope.visible_at = now + self.visibility_timeout;
                    envelope.dequeue_count += 1;
                    return Ok(Some(envelope.event.clone()));
                }
            }

            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                return Ok(None);
            }

            // Small sleep to avoid busy-waiting
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    fn ack(&self, queue: &str, event_id: &str) -> Result<(), PublishError> {
        if let Some(q) = self.guard()?.get_mut(queue) {
            q.retain(|e| e.event.id != event_id);
        }
        Ok(())
    }

    fn nack(&self, queue: &str, event_id: &str, _reason: &str) -> Result<(), PublishError> {
        let mut queues = self.guard()?;
        let envelope = queues
            .get_mut(queue)
            .and_then(|q| q.iter_mut().find(|e| e.event.id == event_id))
            .ok_or_else(|| PublishError::Rejected(format!("unknown message {}", event_id)))?;
        envelope.visible_at = Instant::now();
        Ok(())
    }
}
