//! Bounded HTTP fetch for the metadata crawler.

use std::time::Duration;

use encoding_rs::Encoding;
use reqwest::header::{CONTENT_TYPE, HeaderMap, USER_AGENT};
use reqwest::redirect::Policy;

use super::CrawlError;

/// End-to-end client timeout. Deliberately independent of any request
/// context: background crawling must not inherit an unrelated deadline.
const FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Redirect cap; the sixth redirect rejects the fetch.
const MAX_REDIRECTS: usize = 5;

/// Read at most this many bytes of the response body. Head metadata sits
/// well within the first 256 KiB of any sane document.
const MAX_BODY_BYTES: usize = 256 * 1024;

/// A fixed desktop browser identity; some origins serve stripped-down or
/// bot-gated head sections to unknown agents.
const DESKTOP_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36";

/// Result of a bounded fetch: the effective URL after redirects and the
/// decoded head-candidate text.
#[derive(Debug)]
pub struct FetchedPage {
    pub final_url: String,
    pub body: String,
}

/// HTTP fetcher with the crawl policy baked into its client.
pub struct PageFetcher {
    client: reqwest::Client,
}

impl PageFetcher {
    /// Builds the shared client: 5 s timeout, 5-redirect cap, rustls.
    ///
    /// # Errors
    ///
    /// Returns [`CrawlError::Client`] if the TLS backend cannot initialize.
    pub fn new() -> Result<Self, CrawlError> {
        let client = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .redirect(Policy::limited(MAX_REDIRECTS))
            .build()
            .map_err(|e| CrawlError::Client(e.to_string()))?;

        Ok(Self { client })
    }

    /// Fetches up to the first 256 KiB of the page at `url`.
    ///
    /// Any 2xx or 3xx status counts as success. The body is decoded with the
    /// charset advertised in `Content-Type`, falling back to lossy UTF-8 for
    /// unknown labels or broken byte sequences.
    ///
    /// # Errors
    ///
    /// [`CrawlError::TooManyRedirects`] past the redirect cap,
    /// [`CrawlError::UnexpectedStatus`] outside 2xx/3xx,
    /// [`CrawlError::Request`] for transport failures.
    pub async fn fetch(&self, url: &str) -> Result<FetchedPage, CrawlError> {
        let response = self
            .client
            .get(url)
            .header(USER_AGENT, DESKTOP_USER_AGENT)
            .send()
            .await
            .map_err(|e| {
                if e.is_redirect() {
                    CrawlError::TooManyRedirects
                } else {
                    CrawlError::Request(e.to_string())
                }
            })?;

        let status = response.status();
        if !(status.is_success() || status.is_redirection()) {
            return Err(CrawlError::UnexpectedStatus {
                status: status.as_u16(),
                url: response.url().to_string(),
            });
        }

        let final_url = response.url().to_string();
        let encoding = charset_from_headers(response.headers());

        let mut bytes: Vec<u8> = Vec::new();
        let mut response = response;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| CrawlError::Request(e.to_string()))?
        {
            let remaining = MAX_BODY_BYTES - bytes.len();
            if chunk.len() >= remaining {
                bytes.extend_from_slice(&chunk[..remaining]);
                break;
            }
            bytes.extend_from_slice(&chunk);
        }

        Ok(FetchedPage {
            final_url,
            body: decode_body(&bytes, encoding),
        })
    }
}

/// Picks the response encoding from `Content-Type: ...; charset=...`.
/// Returns `None` when the header is missing or names no known charset.
fn charset_from_headers(headers: &HeaderMap) -> Option<&'static Encoding> {
    let content_type = headers.get(CONTENT_TYPE)?.to_str().ok()?;
    let mime: mime::Mime = content_type.parse().ok()?;
    let charset = mime.get_param(mime::CHARSET)?;
    Encoding::for_label(charset.as_str().as_bytes())
}

/// Charset-aware decode with a raw-bytes fallback: an undecodable stream
/// degrades to lossy UTF-8 rather than failing the crawl.
fn decode_body(bytes: &[u8], encoding: Option<&'static Encoding>) -> String {
    match encoding {
        Some(encoding) => {
            let (text, _, _) = encoding.decode(bytes);
            text.into_owned()
        }
        None => String::from_utf8_lossy(bytes).into_owned(),
    }
}
