//! PostgreSQL persistence layer.

mod pg_outgoing_event_repository;
mod pg_short_url_repository;
pub mod tx;

pub use pg_outgoing_event_repository::PgOutgoingEventRepository;
pub use pg_short_url_repository::PgShortUrlRepository;
pub use tx::{TxRetryPolicy, in_tx};
