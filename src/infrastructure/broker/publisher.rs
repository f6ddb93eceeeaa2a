//! Broker publisher trait and dead-letter message shape.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Broker publish failure. The producer loop turns this into retry
/// accounting on the outbox row; nothing here retries by itself.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("broker error: {0}")]
    Broker(String),
    #[error("payload serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Message shape for the dead-letter topic.
///
/// Carries enough context (original topic, raw payload, tracing fields,
/// partition coordinates) to diagnose a poison message offline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DlqMessage {
    pub topic: String,
    pub payload: Value,
    pub error: String,
    pub trace_id: String,
    pub span_id: String,
    pub correlation_id: String,
    pub partition: i32,
    pub offset: i64,
    pub timestamp: DateTime<Utc>,
}

/// Outbound broker interface used by the producer loop and consumers.
///
/// # Implementations
///
/// - [`crate::infrastructure::broker::KafkaPublisher`] - rdkafka-backed producer
/// - Test mocks available with `cfg(test)`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publishes one message. `key` selects the partition when present;
    /// the outbox producer keys by `short_code` to preserve per-code order.
    async fn publish<'a>(
        &self,
        topic: &str,
        key: Option<&'a str>,
        payload: &[u8],
    ) -> Result<(), PublishError>;

    /// Publishes a dead-letter record. Off the critical path: callers log
    /// failures and move on.
    async fn publish_dlq(
        &self,
        message: DlqMessage,
        target_topic: &str,
    ) -> Result<(), PublishError>;
}
