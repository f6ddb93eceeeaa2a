//! Core business entities.

mod outgoing_event;
mod short_url;

pub use outgoing_event::{
    EventPayload, EventStatus, NewOutgoingEvent, OutgoingEvent, TOPIC_METADATA_CRAWLED,
    TOPIC_METADATA_REQUESTED,
};
pub use short_url::{NewShortUrl, ShortUrl, UrlMetadata, UrlStatus};
