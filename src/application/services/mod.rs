//! Application services.

mod metadata_service;
mod short_url_service;

pub use metadata_service::MetadataService;
pub use short_url_service::ShortUrlService;
