//! Redis-backed cache implementation.

use super::service::{CacheError, CacheResult, CacheService};
use async_trait::async_trait;
use redis::{AsyncCommands, Client, aio::ConnectionManager};
use tracing::{debug, error, info, warn};

use crate::domain::entities::ShortUrl;

/// Default TTL for cached short URL records.
const DEFAULT_TTL_SECONDS: u64 = 24 * 60 * 60;

/// Redis cache for the redirect hot path.
///
/// Records are stored as JSON under `short_url:<code>`. Uses
/// `ConnectionManager` for connection reuse; all operations are fail-open,
/// errors are logged but don't propagate to callers.
pub struct RedisCache {
    client: ConnectionManager,
    ttl_seconds: u64,
    key_prefix: String,
}

impl RedisCache {
    /// Connects to Redis and validates the connection with a PING.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::ConnectionError`] if the URL is invalid, the
    /// connection cannot be established, or the PING health check fails.
    pub async fn connect(redis_url: &str) -> CacheResult<Self> {
        info!("Connecting to Redis");

        let client = Client::open(redis_url).map_err(|e| {
            CacheError::ConnectionError(format!("Failed to create Redis client: {}", e))
        })?;

        let manager = ConnectionManager::new(client).await.map_err(|e| {
            CacheError::ConnectionError(format!("Failed to connect to Redis: {}", e))
        })?;

        let mut test_conn = manager.clone();
        test_conn
            .ping::<()>()
            .await
            .map_err(|e| CacheError::ConnectionError(format!("Redis PING failed: {}", e)))?;

        info!("Connected to Redis");

        Ok(Self {
            client: manager,
            ttl_seconds: DEFAULT_TTL_SECONDS,
            key_prefix: "short_url:".to_string(),
        })
    }

    fn build_key(&self, short_code: &str) -> String {
        format!("{}{}", self.key_prefix, short_code)
    }
}

#[async_trait]
impl CacheService for RedisCache {
    async fn get_short_url(&self, short_code: &str) -> CacheResult<Option<ShortUrl>> {
        let key = self.build_key(short_code);
        let mut conn = self.client.clone();

        match conn.get::<_, Option<String>>(&key).await {
            Ok(Some(raw)) => match serde_json::from_str::<ShortUrl>(&raw) {
                Ok(short_url) => {
                    debug!("Cache HIT: {}", short_code);
                    Ok(Some(short_url))
                }
                Err(e) => {
                    warn!("Cache entry for {} is unreadable: {}", short_code, e);
                    Ok(None)
                }
            },
            Ok(None) => {
                debug!("Cache MISS: {}", short_code);
                Ok(None)
            }
            Err(e) => {
                error!("Redis GET error for {}: {}", short_code, e);
                Ok(None)
            }
        }
    }

    async fn set_short_url(&self, short_url: &ShortUrl) -> CacheResult<()> {
        let key = self.build_key(&short_url.short_code);
        let mut conn = self.client.clone();

        let raw = match serde_json::to_string(short_url) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Failed to serialize {} for cache: {}", short_url.short_code, e);
                return Ok(());
            }
        };

        match conn.set_ex::<_, _, ()>(&key, raw, self.ttl_seconds).await {
            Ok(_) => {
                debug!(
                    "Cache SET: {} (TTL: {}s)",
                    short_url.short_code, self.ttl_seconds
                );
                Ok(())
            }
            Err(e) => {
                warn!("Redis SET error for {}: {}", short_url.short_code, e);
                Ok(())
            }
        }
    }

    async fn health_check(&self) -> bool {
        let mut conn = self.client.clone();
        conn.ping::<()>().await.is_ok()
    }
}
