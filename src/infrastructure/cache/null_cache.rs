//! No-op cache used when Redis is not configured.

use super::service::{CacheResult, CacheService};
use async_trait::async_trait;

use crate::domain::entities::ShortUrl;

/// Cache implementation that stores nothing.
///
/// Every lookup misses and every write succeeds, so the redirect path always
/// falls through to the database.
#[derive(Default)]
pub struct NullCache;

impl NullCache {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CacheService for NullCache {
    async fn get_short_url(&self, _short_code: &str) -> CacheResult<Option<ShortUrl>> {
        Ok(None)
    }

    async fn set_short_url(&self, _short_url: &ShortUrl) -> CacheResult<()> {
        Ok(())
    }

    async fn health_check(&self) -> bool {
        true
    }
}
