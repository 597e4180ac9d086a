//! Configuration values passed to component constructors.
//!
//! # Environment Variables
//!
//! ## Order service
//! - `QUEUE_ORDER_NOTIFICATIONS` - queue for order events (default: order-notifications)
//! - `QUEUE_STOCK_UPDATES` - queue for stock events (default: stock-updates)
//! - `ORDERS_RESERVATION_MAX_ATTEMPTS` - stock reservation attempt ceiling (default: 5)
//! - `ORDERS_RESERVATION_BASE_DELAY_MS` - first retry delay (default: 10)
//! - `ORDERS_RESERVATION_MAX_DELAY_MS` - retry delay cap (default: 200)
//!
//! ## Server binary
//! - `ORDERS_HOST` - bind address (default: 127.0.0.1)
//! - `ORDERS_PORT` - listen port (default: 7071)
//! - `ORDERS_SEED_FILE` - optional JSON catalog of customers and products
//! - `ORDERS_VISIBILITY_TIMEOUT_SECS` - in-memory queue redelivery lease (default: 30)

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::orders::events::{ORDER_NOTIFICATIONS, STOCK_UPDATES};
use crate::retry::RetryPolicy;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Settings for the order service.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderConfig {
    /// Queue receiving `OrderCreated` and `OrderStatusUpdated`
    pub order_notifications_queue: String,
    /// Queue receiving `StockReduced`
    pub stock_updates_queue: String,
    /// Backoff for conflicting stock reservations
    pub reservation_retry: RetryPolicy,
    /// Attempts for a status update (the first try plus one retry)
    pub status_update_attempts: u32,
}

impl Default for OrderConfig {
    fn default() -> Self {
        Self {
            order_notifications_queue: ORDER_NOTIFICATIONS.to_string(),
            stock_updates_queue: STOCK_UPDATES.to_string(),
            reservation_retry: RetryPolicy::default(),
            status_update_attempts: 2,
        }
    }
}

impl OrderConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from any key lookup, falling back to defaults for absent keys.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let retry = defaults.reservation_retry.clone();

        Ok(Self {
            order_notifications_queue: lookup("QUEUE_ORDER_NOTIFICATIONS")
                .unwrap_or(defaults.order_notifications_queue),
            stock_updates_queue: lookup("QUEUE_STOCK_UPDATES")
                .unwrap_or(defaults.stock_updates_queue),
            reservation_retry: retry
                .clone()
                .with_max_attempts(parse_or(&lookup, "ORDERS_RESERVATION_MAX_ATTEMPTS", retry.max_attempts)?)
                .with_base_delay(Duration::from_millis(parse_or(
                    &lookup,
                    "ORDERS_RESERVATION_BASE_DELAY_MS",
                    10,
                )?))
                .with_max_delay(Duration::from_millis(parse_or(
                    &lookup,
                    "ORDERS_RESERVATION_MAX_DELAY_MS",
                    200,
                )?)),
            status_update_attempts: defaults.status_update_attempts,
        })
    }

    pub fn with_order_notifications_queue(mut self, queue: impl Into<String>) -> Self {
        self.order_notifications_queue = queue.into();
        self
    }

    pub fn with_stock_updates_queue(mut self, queue: impl Into<String>) -> Self {
        self.stock_updates_queue = queue.into();
        self
    }

    pub fn with_reservation_retry(mut self, policy: RetryPolicy) -> Self {
        self.reservation_retry = policy;
        self
    }

    pub fn with_status_update_attempts(mut self, attempts: u32) -> Self {
        self.status_update_attempts = attempts.max(1);
        self
    }
}

/// Settings for the HTTP server binary.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
    /// JSON catalog preloaded into the store at startup
    pub seed_file: Option<PathBuf>,
    /// Redelivery lease of the in-memory queue
    pub visibility_timeout: Duration,
    pub orders: OrderConfig,
}

impl ServerConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        Ok(Self {
            host: parse_or(&lookup, "ORDERS_HOST", IpAddr::V4(Ipv4Addr::LOCALHOST))?,
            port: parse_or(&lookup, "ORDERS_PORT", 7071)?,
            seed_file: lookup("ORDERS_SEED_FILE")
                .filter(|path| !path.trim().is_empty())
                .map(PathBuf::from),
            visibility_timeout: Duration::from_secs(parse_or(
                &lookup,
                "ORDERS_VISIBILITY_TIMEOUT_SECS",
                30,
            )?),
            orders: OrderConfig::from_lookup(&lookup)?,
        })
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidEnvVar(key.to_string(), e.to_string())),
        None => Ok(default),
    }
}
