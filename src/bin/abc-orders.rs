//! Order service server: HTTP API, in-memory store and queues, and a
//! logging consumer on each notification queue.

use std::sync::Arc;

use abc_orders::bus::InMemoryQueue;
use abc_orders::catalog::Catalog;
use abc_orders::config::ServerConfig;
use abc_orders::consumer::{ConsumerThread, LoggingHandler, QueueConsumer};
use abc_orders::http;
use abc_orders::orders::OrderService;
use abc_orders::store::InMemoryEntityStore;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();

    // Defaults to info level for our crate if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "abc_orders=info".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env()?;

    let store = InMemoryEntityStore::new();
    if let Some(path) = &config.seed_file {
        Catalog::load(path)?.seed(&store)?;
    }

    let queue = InMemoryQueue::new().with_visibility_timeout(config.visibility_timeout);
    let consumers = [
        &config.orders.order_notifications_queue,
        &config.orders.stock_updates_queue,
    ]
    .map(|name| {
        ConsumerThread::spawn(
            QueueConsumer::new(queue.clone(), name.as_str(), LoggingHandler).with_wait_ms(250),
        )
    });

    let service = Arc::new(OrderService::new(store, queue, config.orders.clone()));

    http::serve(service, config.socket_addr(), async {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("shutting down");
    })
    .await?;

    tokio::task::spawn_blocking(move || {
        for consumer in consumers {
            consumer.stop();
        }
    })
    .await?;

    Ok(())
}
