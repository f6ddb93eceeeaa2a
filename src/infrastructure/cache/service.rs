//! Cache service trait and error types.

use async_trait::async_trait;
use std::fmt;

use crate::domain::entities::ShortUrl;

/// Errors that can occur during cache operations.
#[derive(Debug)]
pub enum CacheError {
    ConnectionError(String),
    OperationError(String),
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::ConnectionError(e) => write!(f, "Cache connection error: {}", e),
            Self::OperationError(e) => write!(f, "Cache operation error: {}", e),
        }
    }
}

impl std::error::Error for CacheError {}

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Trait for caching short URL records on the redirect path.
///
/// Implementations must be thread-safe and fail open: a cache error degrades
/// to a database lookup, never to a failed request.
///
/// # Implementations
///
/// - [`crate::infrastructure::cache::RedisCache`] - Redis-backed cache, key `short_url:<code>`, 24 h TTL
/// - [`crate::infrastructure::cache::NullCache`] - No-op implementation for disabled caching
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CacheService: Send + Sync {
    /// Retrieves a cached short URL record.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(short_url))` on cache hit
    /// - `Ok(None)` on cache miss or error (fail-open behavior)
    async fn get_short_url(&self, short_code: &str) -> CacheResult<Option<ShortUrl>>;

    /// Stores a short URL record with the implementation's default TTL.
    ///
    /// # Errors
    ///
    /// Should not propagate errors to callers. Implementations log errors
    /// and return `Ok(())` to avoid disrupting the request flow.
    async fn set_short_url(&self, short_url: &ShortUrl) -> CacheResult<()>;

    /// Checks if the cache backend is healthy.
    ///
    /// Used by the readiness endpoint.
    async fn health_check(&self) -> bool;
}
