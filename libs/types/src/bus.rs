//! Event publisher collaborator
//!
//! The core fans out orders, trades, and position changes through this
//! seam; the actual transport (broker, websocket fan-out, …) lives outside.
//! Delivery guarantees are the transport's responsibility — the core only
//! promises that a publish failure is surfaced, never silently swallowed,
//! and never rolls back already-applied state.

use parking_lot::Mutex;
use thiserror::Error;

/// Raw order stream
pub const TOPIC_ORDERS: &str = "orders";
/// Executed trade stream
pub const TOPIC_TRADES: &str = "trades";
/// Position change notifications (JSON-serialized Position)
pub const TOPIC_POSITION_UPDATED: &str = "position_updated";

/// Event-stream failure
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("publish to topic {topic} failed: {reason}")]
pub struct PublishError {
    pub topic: String,
    pub reason: String,
}

impl PublishError {
    pub fn new(topic: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            reason: reason.into(),
        }
    }
}

/// Event publisher collaborator
pub trait EventPublisher: Send + Sync {
    fn publish(&self, topic: &str, payload: &[u8]) -> Result<(), PublishError>;
}

/// In-process publisher that records every event, standing in for the
/// external pub/sub transport in tests and embeddings without a broker.
#[derive(Default)]
pub struct MemoryPublisher {
    events: Mutex<Vec<(String, Vec<u8>)>>,
}

impl MemoryPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// All payloads recorded for a topic, in publish order
    pub fn payloads(&self, topic: &str) -> Vec<Vec<u8>> {
        self.events
            .lock()
            .iter()
            .filter(|(t, _)| t == topic)
            .map(|(_, p)| p.clone())
            .collect()
    }

    /// Number of events recorded for a topic
    pub fn count(&self, topic: &str) -> usize {
        self.events.lock().iter().filter(|(t, _)| t == topic).count()
    }
}

impl EventPublisher for MemoryPublisher {
    fn publish(&self, topic: &str, payload: &[u8]) -> Result<(), PublishError> {
        self.events.lock().push((topic.to_string(), payload.to_vec()));
        Ok(())
    }
}

/// Publisher that always fails, for exercising error paths
#[derive(Default)]
pub struct FailingPublisher;

impl EventPublisher for FailingPublisher {
    fn publish(&self, topic: &str, _payload: &[u8]) -> Result<(), PublishError> {
        Err(PublishError::new(topic, "transport unavailable"))
    }
}
