//! Consumer fleet: one consumer task per topic, trace-continuous handling.

mod fleet;
mod metadata_crawled;
mod metadata_requested;

pub use fleet::{Dispatch, TopicConsumer};
pub use metadata_crawled::MetadataCrawledHandler;
pub use metadata_requested::MetadataRequestedHandler;

use async_trait::async_trait;

use crate::domain::RequestScope;
use crate::domain::entities::EventPayload;
use crate::error::AppError;

/// Topic-specific message handler invoked by [`TopicConsumer`].
///
/// `payload.event_id` is the idempotency key: handlers must tolerate
/// redelivery of an event they already processed.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Topic this handler subscribes to.
    fn topic(&self) -> &'static str;

    /// Processes one decoded envelope. An `Ok` return commits the offset;
    /// an error leaves it for redelivery.
    async fn handle(&self, scope: RequestScope, payload: EventPayload) -> Result<(), AppError>;
}
