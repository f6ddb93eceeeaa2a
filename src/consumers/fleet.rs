//! Per-topic consumer loop with poison-message routing.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rdkafka::error::{KafkaError, RDKafkaErrorCode};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use super::EventHandler;
use crate::domain::RequestScope;
use crate::domain::entities::EventPayload;
use crate::infrastructure::broker::{
    DlqMessage, EventPublisher, KafkaTopicConsumer, ReceivedMessage,
};
use crate::telemetry;

/// What to do with the offset after a message has been looked at.
///
/// `Leave` keeps the offset uncommitted so the message is redelivered after
/// a rebalance or restart; the loop itself moves on either way.
#[derive(Debug, PartialEq, Eq)]
pub enum Dispatch {
    Commit,
    Leave,
}

/// One topic, one group, one handler.
///
/// Envelopes that fail to parse are poison: they are forwarded to the
/// dead-letter topic and committed so they never block the partition.
/// Handler failures are left uncommitted instead, because transient causes
/// (a slow origin, a database blip) deserve a redelivery.
pub struct TopicConsumer {
    consumer: KafkaTopicConsumer,
    handler: Arc<dyn EventHandler>,
    publisher: Arc<dyn EventPublisher>,
    dlq_topic: String,
}

impl TopicConsumer {
    pub fn new(
        consumer: KafkaTopicConsumer,
        handler: Arc<dyn EventHandler>,
        publisher: Arc<dyn EventPublisher>,
        dlq_topic: String,
    ) -> Self {
        Self {
            consumer,
            handler,
            publisher,
            dlq_topic,
        }
    }

    /// Consumes until `shutdown` is cancelled. The message in flight is
    /// handled to completion before the loop exits.
    pub async fn run(&self, shutdown: CancellationToken) {
        tracing::info!(topic = self.consumer.topic(), "consumer started");

        loop {
            let received = tokio::select! {
                () = shutdown.cancelled() => break,
                received = self.consumer.recv() => received,
            };

            let message = match received {
                Ok(message) => message,
                Err(e) if is_fatal_receive_error(&e) => {
                    tracing::error!(
                        topic = self.consumer.topic(),
                        error = %e,
                        "consumer receive failed fatally, stopping"
                    );
                    break;
                }
                Err(e) => {
                    tracing::error!(
                        topic = self.consumer.topic(),
                        error = %e,
                        "consumer receive failed"
                    );
                    tokio::time::sleep(Duration::from_secs(1)).await;
                    continue;
                }
            };

            let outcome = dispatch(
                self.handler.as_ref(),
                self.publisher.as_ref(),
                &self.dlq_topic,
                self.consumer.topic(),
                &message,
            )
            .await;

            if outcome == Dispatch::Commit
                && let Err(e) = self.consumer.commit(message.partition, message.offset)
            {
                tracing::error!(
                    topic = self.consumer.topic(),
                    partition = message.partition,
                    offset = message.offset,
                    error = %e,
                    "offset commit failed"
                );
            }
        }

        tracing::info!(topic = self.consumer.topic(), "consumer stopped");
    }
}

/// Fatal receive errors end the read loop instead of the log-sleep-retry
/// path: end of partition is a stop signal, and a client in the librdkafka
/// fatal state never recovers without a restart.
fn is_fatal_receive_error(error: &KafkaError) -> bool {
    matches!(error, KafkaError::PartitionEOF(_))
        || matches!(
            error,
            KafkaError::MessageConsumption(RDKafkaErrorCode::Fatal)
        )
}

/// Parses the envelope and runs the handler inside a span parented on the
/// producer's trace context carried in the payload.
pub(crate) async fn dispatch(
    handler: &dyn EventHandler,
    publisher: &dyn EventPublisher,
    dlq_topic: &str,
    topic: &str,
    message: &ReceivedMessage,
) -> Dispatch {
    let payload: EventPayload = match serde_json::from_slice(&message.payload) {
        Ok(payload) => payload,
        Err(e) => {
            tracing::warn!(
                topic,
                partition = message.partition,
                offset = message.offset,
                error = %e,
                "malformed envelope, routing to dead letter"
            );
            route_to_dlq(publisher, dlq_topic, topic, message, &e.to_string()).await;
            return Dispatch::Commit;
        }
    };

    let span = tracing::info_span!(
        "consume_message",
        otel.name = %format!("Consumer.ConsumeMessage | Topic: {topic}"),
        topic,
        event_id = payload.event_id,
        correlation_id = %payload.correlation_id,
        partition = message.partition,
        offset = message.offset,
    );
    telemetry::adopt_remote_parent(&span, &payload.trace_id, &payload.span_id);

    let scope = RequestScope::for_consumer(payload.correlation_id.clone());

    match handler.handle(scope, payload).instrument(span).await {
        Ok(()) => Dispatch::Commit,
        Err(e) => {
            tracing::error!(
                topic,
                partition = message.partition,
                offset = message.offset,
                error = %e,
                "handler failed, offset left uncommitted"
            );
            Dispatch::Leave
        }
    }
}

/// Best-effort dead-letter publish. A DLQ failure is logged and swallowed;
/// losing a poison message beats wedging the partition on it.
async fn route_to_dlq(
    publisher: &dyn EventPublisher,
    dlq_topic: &str,
    topic: &str,
    message: &ReceivedMessage,
    error: &str,
) {
    let raw = serde_json::from_slice::<Value>(&message.payload)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&message.payload).into_owned()));

    let field = |name: &str| {
        raw.get(name)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };

    let dlq = DlqMessage {
        topic: topic.to_string(),
        error: error.to_string(),
        trace_id: field("trace_id"),
        span_id: field("span_id"),
        correlation_id: field("correlation_id"),
        payload: raw,
        partition: message.partition,
        offset: message.offset,
        timestamp: Utc::now(),
    };

    if let Err(e) = publisher.publish_dlq(dlq, dlq_topic).await {
        tracing::error!(topic, error = %e, "dead letter publish failed");
    }
}
