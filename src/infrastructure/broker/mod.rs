//! Kafka-backed broker adapters.

mod kafka_consumer;
mod kafka_publisher;
mod publisher;

pub use kafka_consumer::{KafkaTopicConsumer, ReceivedMessage};
pub use kafka_publisher::KafkaPublisher;
pub use publisher::{DlqMessage, EventPublisher, PublishError};

#[cfg(test)]
pub use publisher::MockEventPublisher;
