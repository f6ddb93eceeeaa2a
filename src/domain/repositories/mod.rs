//! Repository traits for persistent entities.

mod outgoing_event_repository;
mod short_url_repository;

pub use outgoing_event_repository::OutgoingEventRepository;
pub use short_url_repository::ShortUrlRepository;

#[cfg(test)]
pub use outgoing_event_repository::MockOutgoingEventRepository;
#[cfg(test)]
pub use short_url_repository::MockShortUrlRepository;
