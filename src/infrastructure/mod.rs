//! Infrastructure adapters: Postgres persistence, Redis cache, Kafka broker.

pub mod broker;
pub mod cache;
pub mod persistence;
