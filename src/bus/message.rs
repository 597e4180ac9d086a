//! Bus message type and publish errors.

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

/// A message travelling over the bus.
#[derive(Clone, Debug, PartialEq)]
pub struct Event {
    /// Unique identifier for this message
    pub id: String,
    /// Event type (e.g., "OrderCreated", "StockReduced")
    pub event_type: String,
    /// Serialized payload (JSON for everything the order core emits)
    pub payload: Vec<u8>,
    /// Optional metadata (correlation ids, entity ids, ...)
    pub metadata: Option<Vec<(String, String)>>,
}

impl Event {
    /// Create a new message with the given type and payload.
    pub fn new(id: impl Into<String>, event_type: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            id: id.into(),
            event_type: event_type.into(),
            payload,
            metadata: None,
        }
    }

    /// Create a message with a JSON-serialized payload.
    pub fn json<T: Serialize>(
        id: impl Into<String>,
        event_type: impl Into<String>,
        payload: &T,
    ) -> Result<Self, PublishError> {
        let bytes = serde_json::to_vec(payload)
            .map_err(|e| PublishError::SerializationFailed(e.to_string()))?;
        Ok(Self::new(id, event_type, bytes))
    }

    /// Decode the JSON payload.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.payload)
    }

    /// Create a message with a string payload.
    pub fn with_string_payload(
        id: impl Into<String>,
        event_type: impl Into<String>,
        payload: impl Into<String>,
    ) -> Self {
        Self::new(id, event_type, payload.into().into_bytes())
    }

    /// Add metadata to the message.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata
            .get_or_insert_with(Vec::new)
            .push((key.into(), value.into()));
        self
    }

    /// Look up a metadata value.
    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata
            .as_ref()?
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Get the payload as a string (if valid UTF-8).
    pub fn payload_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.payload).ok()
    }
}

/// Error type for bus operations.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("serialization failed: {0}")]
    SerializationFailed(String),

    /// The broker refused the message or the receipt.
    #[error("message rejected: {0}")]
    Rejected(String),

    #[error("publish timeout")]
    Timeout,

    #[error("bus error: {0}")]
    Other(#[source] Box<dyn std::error::Error + Send + Sync>),
}
