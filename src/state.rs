//! Shared application state for the HTTP layer.

use std::sync::Arc;

use sqlx::PgPool;

use crate::application::services::ShortUrlService;
use crate::infrastructure::cache::CacheService;
use crate::utils::url_validator::OriginalUrlValidator;

#[derive(Clone)]
pub struct AppState {
    pub short_urls: Arc<ShortUrlService>,
    pub url_validator: Arc<dyn OriginalUrlValidator>,
    pub db: PgPool,
    pub cache: Arc<dyn CacheService>,
    /// Header names the edge guarantees on every request and response.
    pub requires_metadata: Arc<Vec<String>>,
}
