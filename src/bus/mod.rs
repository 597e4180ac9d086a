//! Message bus - point-to-point queues with at-least-once delivery.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────┐   send(queue, event)   ┌──────────────────────┐
//! │  EventPublisher  │ ─────────────────────▶ │   Sender / Listener  │
//! │  (order core)    │                        │   traits             │
//! └──────────────────┘                        └──────────────────────┘
//!                                                 │              │
//!                                                 ▼              ▼
//!                                       ┌───────────────┐ ┌─────────────────┐
//!                                       │ InMemoryQueue │ │ Storage queue / │
//!                                       │  (included)   │ │ broker (extern) │
//!                                       └───────────────┘ └─────────────────┘
//!                                                 │
//!                        listen / ack / nack      ▼
//!                                       ┌───────────────────────┐
//!                                       │ QueueConsumer         │
//!                                       └───────────────────────┘
//! ```
//!
//! A successful `send` means the message is enqueued. Consumers may see a
//! message more than once and must process idempotently; a message only
//! leaves its queue when acknowledged.

mod in_memory_queue;
mod listener;
mod message;
mod sender;

pub use in_memory_queue::InMemoryQueue;
pub use listener::Listener;
pub use message::{Event, PublishError};
pub use sender::Sender;
