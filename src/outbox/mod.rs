//! Transactional outbox producer.

mod producer;

pub use producer::{OutboxProducer, spawn};
