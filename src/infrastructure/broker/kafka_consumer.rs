//! Kafka consumer wrapper with manual offset commits.

use rdkafka::config::ClientConfig;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::error::KafkaError;
use rdkafka::message::Message;
use rdkafka::{Offset, TopicPartitionList};

use super::publisher::PublishError;

/// One message lifted off the wire, with the coordinates needed to commit
/// it (or to describe it in a dead-letter record).
#[derive(Debug, Clone)]
pub struct ReceivedMessage {
    pub payload: Vec<u8>,
    pub partition: i32,
    pub offset: i64,
}

/// Single-topic consumer with `enable.auto.commit=false`.
///
/// Offsets advance only through [`KafkaTopicConsumer::commit`], which the
/// fleet calls after the handler succeeds (or after a message is judged
/// poison). A crash between handling and commit therefore redelivers, which
/// is why handlers key idempotency off `event_id`.
pub struct KafkaTopicConsumer {
    consumer: StreamConsumer,
    topic: String,
}

impl KafkaTopicConsumer {
    pub fn new(
        brokers: &str,
        group_id: &str,
        client_id: &str,
        topic: &str,
    ) -> Result<Self, PublishError> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("group.id", group_id)
            .set("client.id", client_id)
            .set("enable.auto.commit", "false")
            .set("auto.offset.reset", "earliest")
            .set("session.timeout.ms", "6000")
            .create()
            .map_err(|e| PublishError::Broker(e.to_string()))?;

        consumer
            .subscribe(&[topic])
            .map_err(|e| PublishError::Broker(e.to_string()))?;

        Ok(Self {
            consumer,
            topic: topic.to_string(),
        })
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Awaits the next message. A message with no payload is surfaced as an
    /// empty byte buffer so the fleet can route it through poison handling.
    pub async fn recv(&self) -> Result<ReceivedMessage, KafkaError> {
        let message = self.consumer.recv().await?;
        Ok(ReceivedMessage {
            payload: message.payload().unwrap_or_default().to_vec(),
            partition: message.partition(),
            offset: message.offset(),
        })
    }

    /// Commits `offset + 1` for the partition, marking the message consumed.
    pub fn commit(&self, partition: i32, offset: i64) -> Result<(), KafkaError> {
        let mut tpl = TopicPartitionList::new();
        tpl.add_partition_offset(&self.topic, partition, Offset::Offset(offset + 1))?;
        self.consumer.commit(&tpl, CommitMode::Async)
    }
}
