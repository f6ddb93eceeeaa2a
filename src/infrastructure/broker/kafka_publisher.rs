//! Kafka producer backed by rdkafka's `FutureProducer`.

use std::time::Duration;

use async_trait::async_trait;
use rdkafka::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::util::Timeout;
use tracing::debug;

use super::publisher::{DlqMessage, EventPublisher, PublishError};

/// Delivery report timeout for a single publish.
const DELIVERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Kafka-backed publisher shared by the outbox producer and the consumers'
/// DLQ path. The underlying `FutureProducer` is cheap to clone and pools
/// connections internally.
pub struct KafkaPublisher {
    producer: FutureProducer,
}

impl KafkaPublisher {
    /// Creates the producer. Does not connect eagerly; the first publish
    /// establishes broker connections.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError::Broker`] if the client configuration is
    /// rejected by librdkafka.
    pub fn new(brokers: &str, client_id: &str) -> Result<Self, PublishError> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("client.id", client_id)
            .set("message.timeout.ms", "5000")
            .set("acks", "all")
            .create()
            .map_err(|e| PublishError::Broker(e.to_string()))?;

        Ok(Self { producer })
    }
}

#[async_trait]
impl EventPublisher for KafkaPublisher {
    async fn publish<'a>(
        &self,
        topic: &str,
        key: Option<&'a str>,
        payload: &[u8],
    ) -> Result<(), PublishError> {
        let mut record: FutureRecord<'_, str, [u8]> = FutureRecord::to(topic).payload(payload);
        if let Some(key) = key {
            record = record.key(key);
        }

        let (partition, offset) = self
            .producer
            .send(record, Timeout::After(DELIVERY_TIMEOUT))
            .await
            .map_err(|(e, _)| PublishError::Broker(e.to_string()))?;

        debug!(topic, partition, offset, "message delivered");
        Ok(())
    }

    async fn publish_dlq(
        &self,
        message: DlqMessage,
        target_topic: &str,
    ) -> Result<(), PublishError> {
        let bytes = serde_json::to_vec(&message)?;
        self.publish(target_topic, Some(&message.topic), &bytes)
            .await
    }
}
