//! Metadata crawl orchestration.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::crawler::PageCrawler;
use crate::domain::RequestScope;
use crate::domain::entities::{NewOutgoingEvent, ShortUrl, TOPIC_METADATA_CRAWLED};
use crate::domain::repositories::ShortUrlRepository;
use crate::error::AppError;
use crate::utils::snowflake::SnowflakeGenerator;

/// Service driving the crawl-and-store step of the metadata pipeline.
///
/// Invoked by the `metadata.requested` consumer. A crawl failure leaves the
/// row untouched (the previous metadata, if any, survives); only a
/// successful crawl writes, and that write emits the `metadata.crawled`
/// event in the same transaction.
pub struct MetadataService {
    repository: Arc<dyn ShortUrlRepository>,
    crawler: Arc<dyn PageCrawler>,
    ids: Arc<SnowflakeGenerator>,
}

impl MetadataService {
    pub fn new(
        repository: Arc<dyn ShortUrlRepository>,
        crawler: Arc<dyn PageCrawler>,
        ids: Arc<SnowflakeGenerator>,
    ) -> Self {
        Self {
            repository,
            crawler,
            ids,
        }
    }

    /// Crawls the original URL behind `short_code` and stores the result.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::UrlNotFound`] when the code has no row,
    /// [`AppError::Crawl`] when the fetch fails (no database write happens),
    /// and [`AppError::Database`] on persistence errors.
    pub async fn crawl_url_metadata(
        &self,
        scope: &RequestScope,
        short_code: &str,
    ) -> Result<ShortUrl, AppError> {
        let record = self
            .repository
            .find_by_code(short_code)
            .await?
            .ok_or_else(|| AppError::UrlNotFound {
                short_code: short_code.to_string(),
            })?;

        let metadata = self.crawler.crawl(&record.original_url).await?;

        tracing::info!(
            short_code,
            final_url = %metadata.final_url,
            title = %metadata.title,
            correlation_id = %scope.correlation_id,
            "crawl succeeded"
        );

        let mut data = BTreeMap::new();
        data.insert("short_code".to_string(), short_code.to_string());
        data.insert("original_url".to_string(), record.original_url.clone());
        let event =
            NewOutgoingEvent::from_scope(self.ids.next_id(), TOPIC_METADATA_CRAWLED, scope, data);

        self.repository
            .set_metadata_with_event(short_code, metadata, event)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::{CrawlError, MockPageCrawler};
    use crate::domain::entities::{UrlMetadata, UrlStatus};
    use crate::domain::repositories::MockShortUrlRepository;
    use chrono::Utc;

    fn test_record(code: &str, url: &str) -> ShortUrl {
        ShortUrl {
            short_code: code.to_string(),
            original_url: url.to_string(),
            status: UrlStatus::Active,
            metadata: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn scope() -> RequestScope {
        RequestScope::for_consumer("corr-meta".to_string())
    }

    fn service(repo: MockShortUrlRepository, crawler: MockPageCrawler) -> MetadataService {
        MetadataService::new(
            Arc::new(repo),
            Arc::new(crawler),
            Arc::new(SnowflakeGenerator::new(2)),
        )
    }

    #[tokio::test]
    async fn test_crawl_stores_metadata_with_crawled_event() {
        let mut repo = MockShortUrlRepository::new();
        repo.expect_find_by_code()
            .withf(|code| code == "abc1234")
            .returning(|code| Ok(Some(test_record(code, "https://example.com/article"))));
        repo.expect_set_metadata_with_event()
            .withf(|code, metadata, event| {
                code == "abc1234"
                    && metadata.title == "An Article"
                    && event.topic == TOPIC_METADATA_CRAWLED
                    && event.payload.data.get("short_code").map(String::as_str) == Some("abc1234")
            })
            .returning(|code, metadata, _| {
                let mut record = test_record(code, "https://example.com/article");
                record.metadata = Some(metadata);
                Ok(record)
            });

        let mut crawler = MockPageCrawler::new();
        crawler
            .expect_crawl()
            .withf(|url| url == "https://example.com/article")
            .returning(|url| {
                Ok(UrlMetadata {
                    final_url: url.to_string(),
                    title: "An Article".to_string(),
                    ..UrlMetadata::default()
                })
            });

        let result = service(repo, crawler)
            .crawl_url_metadata(&scope(), "abc1234")
            .await
            .unwrap();

        assert_eq!(result.metadata.unwrap().title, "An Article");
    }

    #[tokio::test]
    async fn test_crawl_failure_writes_nothing() {
        let mut repo = MockShortUrlRepository::new();
        repo.expect_find_by_code()
            .returning(|code| Ok(Some(test_record(code, "https://example.com/broken"))));
        repo.expect_set_metadata_with_event().never();

        let mut crawler = MockPageCrawler::new();
        crawler
            .expect_crawl()
            .returning(|_| Err(CrawlError::TooManyRedirects));

        let result = service(repo, crawler)
            .crawl_url_metadata(&scope(), "abc1234")
            .await;

        assert!(matches!(result, Err(AppError::Crawl(_))));
    }

    #[tokio::test]
    async fn test_crawl_unknown_code_skips_fetch() {
        let mut repo = MockShortUrlRepository::new();
        repo.expect_find_by_code().returning(|_| Ok(None));
        repo.expect_set_metadata_with_event().never();

        let mut crawler = MockPageCrawler::new();
        crawler.expect_crawl().never();

        let result = service(repo, crawler)
            .crawl_url_metadata(&scope(), "gone1234")
            .await;

        assert!(matches!(result, Err(AppError::UrlNotFound { .. })));
    }
}
