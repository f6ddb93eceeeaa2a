//! Outbox event entity and its wire payload.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::RequestScope;

/// Topic carrying crawl requests emitted by the shorten path.
pub const TOPIC_METADATA_REQUESTED: &str = "urlshortener.metadata.requested.v1";
/// Topic carrying crawl results emitted by the metadata pipeline.
pub const TOPIC_METADATA_CRAWLED: &str = "urlshortener.metadata.crawled.v1";

/// Outbox row lifecycle.
///
/// `Published` and `Failed` are terminal: the producer never re-enumerates
/// them and they never transition back to `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventStatus {
    Pending,
    Published,
    Failed,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Published => "PUBLISHED",
            Self::Failed => "FAILED",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "PUBLISHED" => Self::Published,
            "FAILED" => Self::Failed,
            _ => Self::Pending,
        }
    }
}

/// JSON envelope published to the broker.
///
/// `event_id` is the consumer-side idempotency key. Consumers rehydrate the
/// producer's span from `trace_id` / `span_id` carried here, not from broker
/// headers. `BTreeMap` keeps the serialized form canonical.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventPayload {
    pub event_id: i64,
    pub correlation_id: String,
    pub trace_id: String,
    pub span_id: String,
    pub occurred_at: DateTime<Utc>,
    pub data: BTreeMap<String, String>,
}

/// A row of the transactional outbox.
///
/// Created in the same transaction as the domain mutation it describes and
/// mutated only by the producer loop (status / retry_count / last_error).
#[derive(Debug, Clone)]
pub struct OutgoingEvent {
    pub id: i64,
    pub topic: String,
    pub status: EventStatus,
    pub retry_count: i32,
    pub last_error: Option<String>,
    pub correlation_id: String,
    pub trace_id: String,
    pub span_id: String,
    pub payload: EventPayload,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input data for inserting a Pending outbox row.
#[derive(Debug, Clone)]
pub struct NewOutgoingEvent {
    pub id: i64,
    pub topic: String,
    pub correlation_id: String,
    pub trace_id: String,
    pub span_id: String,
    pub payload: EventPayload,
}

impl NewOutgoingEvent {
    /// Builds a Pending event carrying the caller's correlation id and the
    /// trace / span identifiers of the currently active span.
    pub fn from_scope(
        event_id: i64,
        topic: &str,
        scope: &RequestScope,
        data: BTreeMap<String, String>,
    ) -> Self {
        let (trace_id, span_id) = crate::telemetry::current_trace_ids();

        Self {
            id: event_id,
            topic: topic.to_string(),
            correlation_id: scope.correlation_id.clone(),
            trace_id: trace_id.clone(),
            span_id: span_id.clone(),
            payload: EventPayload {
                event_id,
                correlation_id: scope.correlation_id.clone(),
                trace_id,
                span_id,
                occurred_at: Utc::now(),
                data,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_status_round_trip() {
        for status in [
            EventStatus::Pending,
            EventStatus::Published,
            EventStatus::Failed,
        ] {
            assert_eq!(EventStatus::parse(status.as_str()), status);
        }
    }

    #[test]
    fn test_payload_serializes_with_sorted_data_keys() {
        let mut data = BTreeMap::new();
        data.insert("short_code".to_string(), "abc1234".to_string());
        data.insert("original_url".to_string(), "https://example.com".to_string());

        let payload = EventPayload {
            event_id: 42,
            correlation_id: "corr-1".to_string(),
            trace_id: "0af7651916cd43dd8448eb211c80319c".to_string(),
            span_id: "b7ad6b7169203331".to_string(),
            occurred_at: Utc::now(),
            data,
        };

        let json = serde_json::to_string(&payload).unwrap();
        let original = json.find("original_url").unwrap();
        let short = json.find("short_code").unwrap();
        assert!(original < short);

        let back: EventPayload = serde_json::from_str(&json).unwrap();
        assert_eq!(back, payload);
    }

    #[test]
    fn test_from_scope_copies_correlation_into_payload() {
        let scope = RequestScope::new("corr-789".to_string(), "req-1".to_string());
        let event =
            NewOutgoingEvent::from_scope(7, TOPIC_METADATA_REQUESTED, &scope, BTreeMap::new());

        assert_eq!(event.id, 7);
        assert_eq!(event.payload.event_id, 7);
        assert_eq!(event.correlation_id, "corr-789");
        assert_eq!(event.payload.correlation_id, "corr-789");
        assert_eq!(event.trace_id, event.payload.trace_id);
        assert_eq!(event.span_id, event.payload.span_id);
    }
}
