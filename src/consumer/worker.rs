//! Background thread running a queue consumer.

use std::sync::mpsc::{channel, Sender, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::{ConsumeOutcome, NotificationHandler, QueueConsumer};
use crate::bus::Listener;

/// Statistics from a consumer thread.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConsumerStats {
    /// Messages handled and acknowledged.
    pub processed: usize,
    /// Redeliveries acknowledged without handling.
    pub duplicates: usize,
    /// Messages left on the queue for redelivery.
    pub retained: usize,
    /// Listener or acknowledgement failures.
    pub transport_errors: usize,
    /// Number of poll cycles completed.
    pub polls: usize,
}

/// A background thread that drives a [`QueueConsumer`] until stopped.
///
/// ## Example
///
/// ```
/// use abc_orders::bus::InMemoryQueue;
/// use abc_orders::consumer::{ConsumerThread, OrderBoard, QueueConsumer};
///
/// let queue = InMemoryQueue::new();
/// let board = OrderBoard::new();
///
/// let handle = ConsumerThread::spawn(
///     QueueConsumer::new(queue.clone(), "order-notifications", board.clone()).with_wait_ms(5),
/// );
///
/// // ... publish notifications to the queue ...
///
/// let stats = handle.stop();
/// assert_eq!(stats.processed, 0);
/// ```
pub struct ConsumerThread {
    stop_tx: Sender<()>,
    handle: Option<JoinHandle<ConsumerStats>>,
}

impl ConsumerThread {
    /// Spawn a thread polling the consumer's queue.
    pub fn spawn<L, H>(mut consumer: QueueConsumer<L, H>) -> Self
    where
        L: Listener + 'static,
        H: NotificationHandler + 'static,
    {
        let (stop_tx, stop_rx) = channel();

        let handle = thread::spawn(move || {
            let mut stats = ConsumerStats::default();
            tracing::info!(queue = consumer.queue(), "consumer started");

            loop {
                match stop_rx.try_recv() {
                    Ok(()) | Err(TryRecvError::Disconnected) => break,
                    Err(TryRecvError::Empty) => {}
                }

                stats.polls += 1;

                match consumer.process_next() {
                    Ok(ConsumeOutcome::Idle) => {}
                    Ok(ConsumeOutcome::Processed { .. }) => stats.processed += 1,
                    Ok(ConsumeOutcome::Duplicate { .. }) => stats.duplicates += 1,
                    Ok(ConsumeOutcome::Retained { .. }) => stats.retained += 1,
                    Err(error) => {
                        stats.transport_errors += 1;
                        tracing::error!(queue = consumer.queue(), %error, "queue transport error");
                        // Back off instead of spinning on a broken listener.
                        thread::sleep(Duration::from_millis(50));
                    }
                }
            }

            tracing::info!(queue = consumer.queue(), ?stats, "consumer stopped");
            stats
        });

        Self {
            stop_tx,
            handle: Some(handle),
        }
    }

    /// Signal the consumer to stop and wait for it to finish.
    /// Returns the consumer statistics.
    pub fn stop(mut self) -> ConsumerStats {
        let _ = self.stop_tx.send(());
        match self.handle.take() {
            Some(handle) => handle.join().unwrap_or_default(),
            None => ConsumerStats::default(),
        }
    }

    /// Signal the consumer to stop without waiting.
    pub fn signal_stop(&self) {
        let _ = self.stop_tx.send(());
    }
}

impl Drop for ConsumerThread {
    fn drop(&mut self) {
        let _ = self.stop_tx.send(());
    }
}
