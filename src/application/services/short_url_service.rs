//! Shorten and retrieve operations.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::domain::RequestScope;
use crate::domain::entities::{NewOutgoingEvent, NewShortUrl, ShortUrl, TOPIC_METADATA_REQUESTED};
use crate::domain::repositories::ShortUrlRepository;
use crate::error::AppError;
use crate::infrastructure::cache::CacheService;
use crate::utils::code_generator::generate_code;
use crate::utils::snowflake::SnowflakeGenerator;

/// Collision retries before the shorten request gives up. At 62^7 codes the
/// second attempt already succeeds in practice.
const MAX_CODE_ATTEMPTS: usize = 5;

/// Service for creating and resolving short URLs.
///
/// The write path is outbox-coupled: every successful insert also records a
/// `metadata.requested` event in the same transaction, so the crawl pipeline
/// observes exactly the rows that exist.
pub struct ShortUrlService {
    repository: Arc<dyn ShortUrlRepository>,
    cache: Arc<dyn CacheService>,
    ids: Arc<SnowflakeGenerator>,
}

impl ShortUrlService {
    pub fn new(
        repository: Arc<dyn ShortUrlRepository>,
        cache: Arc<dyn CacheService>,
        ids: Arc<SnowflakeGenerator>,
    ) -> Self {
        Self {
            repository,
            cache,
            ids,
        }
    }

    /// Shortens `original_url`, or returns the existing record when the URL
    /// was shortened before.
    ///
    /// # Idempotency
    ///
    /// Repeating the same URL returns the same code and emits no new event.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Database`] on database errors and
    /// [`AppError::Internal`] if code generation keeps colliding.
    pub async fn shorten(
        &self,
        scope: &RequestScope,
        original_url: &str,
    ) -> Result<ShortUrl, AppError> {
        if let Some(existing) = self.repository.find_by_original_url(original_url).await? {
            tracing::debug!(
                short_code = %existing.short_code,
                correlation_id = %scope.correlation_id,
                "shorten hit existing record"
            );
            return Ok(existing);
        }

        for attempt in 1..=MAX_CODE_ATTEMPTS {
            let short_code = generate_code();

            let mut data = BTreeMap::new();
            data.insert("short_code".to_string(), short_code.clone());
            data.insert("original_url".to_string(), original_url.to_string());
            let event = NewOutgoingEvent::from_scope(
                self.ids.next_id(),
                TOPIC_METADATA_REQUESTED,
                scope,
                data,
            );

            let new_url = NewShortUrl {
                short_code: short_code.clone(),
                original_url: original_url.to_string(),
            };

            match self.repository.insert_with_event(new_url, event).await {
                Ok(created) => return Ok(created),
                Err(AppError::CodeCollision { .. }) => {
                    tracing::warn!(short_code = %short_code, attempt, "short code collision");
                }
                Err(e) => return Err(e),
            }
        }

        Err(AppError::Internal(format!(
            "failed to generate a unique short code after {MAX_CODE_ATTEMPTS} attempts"
        )))
    }

    /// Resolves `short_code` to its record, cache first.
    ///
    /// On a cache miss the database row is written back to the cache off the
    /// request path; a cache failure degrades to the database silently.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::UrlNotFound`] when no row exists and
    /// [`AppError::InactiveUrl`] when the row's status is not ACTIVE.
    pub async fn retrieve(
        &self,
        scope: &RequestScope,
        short_code: &str,
    ) -> Result<ShortUrl, AppError> {
        if let Ok(Some(cached)) = self.cache.get_short_url(short_code).await {
            tracing::debug!(
                short_code,
                correlation_id = %scope.correlation_id,
                "redirect served from cache"
            );
            return ensure_active(cached);
        }

        let found = self
            .repository
            .find_by_code(short_code)
            .await?
            .ok_or_else(|| AppError::UrlNotFound {
                short_code: short_code.to_string(),
            })?;

        let record = ensure_active(found)?;

        // Write-back off the request path; only active rows are cached.
        let cache = Arc::clone(&self.cache);
        let to_cache = record.clone();
        tokio::spawn(async move {
            let _ = cache.set_short_url(&to_cache).await;
        });

        Ok(record)
    }
}

fn ensure_active(record: ShortUrl) -> Result<ShortUrl, AppError> {
    if record.is_active() {
        Ok(record)
    } else {
        Err(AppError::InactiveUrl {
            short_code: record.short_code,
        })
    }
}
