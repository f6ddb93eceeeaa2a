//! Head-only metadata crawler.
//!
//! Fetches at most the first 256 KiB of a page, parses only the `<head>`,
//! and assembles [`UrlMetadata`] with Open Graph fields preferred over their
//! plain-HTML counterparts.

mod fetcher;
mod head_parser;
mod metadata;

pub use fetcher::{FetchedPage, PageFetcher};
pub use head_parser::{HeadFields, parse_head};
pub use metadata::{build_metadata, resolve_url, upgrade_to_https};

use crate::domain::entities::UrlMetadata;

/// Crawl failures. None of these mutate the database; the caller surfaces
/// them and the short URL row keeps its previous metadata.
#[derive(Debug, thiserror::Error)]
pub enum CrawlError {
    #[error("too many redirects")]
    TooManyRedirects,
    #[error("unexpected status code {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },
    #[error("request failed: {0}")]
    Request(String),
    #[error("http client setup failed: {0}")]
    Client(String),
}

/// Crawling seam consumed by the metadata service.
///
/// # Implementations
///
/// - [`Crawler`] - the real fetch-and-parse pipeline
/// - Test mocks available with `cfg(test)`
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait PageCrawler: Send + Sync {
    /// Crawls `original_url` and returns the extracted metadata.
    async fn crawl(&self, original_url: &str) -> Result<UrlMetadata, CrawlError>;
}

/// The crawler: a bounded fetch followed by head-only parsing.
pub struct Crawler {
    fetcher: PageFetcher,
}

impl Crawler {
    /// # Errors
    ///
    /// Returns [`CrawlError::Client`] if the HTTP client cannot be built.
    pub fn new() -> Result<Self, CrawlError> {
        Ok(Self {
            fetcher: PageFetcher::new()?,
        })
    }

}

#[async_trait::async_trait]
impl PageCrawler for Crawler {
    /// Crawls `original_url`, upgrading `http://` inputs to `https://`
    /// before fetching. Parsing itself cannot fail; every [`CrawlError`]
    /// comes from the fetch.
    async fn crawl(&self, original_url: &str) -> Result<UrlMetadata, CrawlError> {
        let target = upgrade_to_https(original_url);
        let page = self.fetcher.fetch(&target).await?;
        let head = parse_head(&page.body);
        Ok(build_metadata(&page.final_url, &head))
    }
}
