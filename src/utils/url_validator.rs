//! Inbound URL validation for the shorten endpoint.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::redirect::Policy;
use tokio::net::lookup_host;
use url::Url;

use crate::error::AppError;

/// Timeout for the HEAD probe.
const PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// Validation seam for the shorten handler.
///
/// # Implementations
///
/// - [`UrlValidator`] - the real parse / DNS / HEAD-probe pipeline
/// - Test mocks available with `cfg(test)`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OriginalUrlValidator: Send + Sync {
    /// Checks whether `raw` may be shortened.
    async fn validate(&self, raw: &str) -> Result<(), AppError>;
}

/// Validates URLs before they are accepted for shortening.
///
/// Four gates, all mapping to `invalid_original_url`: the URL parses, the
/// scheme is http/https, the host resolves in DNS, and a HEAD probe
/// (3 s timeout, redirects not followed) does not hard-fail.
pub struct UrlValidator {
    client: reqwest::Client,
}

impl UrlValidator {
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] if the probe client cannot be built.
    pub fn new() -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(PROBE_TIMEOUT)
            .redirect(Policy::none())
            .build()
            .map_err(|e| AppError::Internal(format!("http client setup failed: {e}")))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl OriginalUrlValidator for UrlValidator {
    /// Returns [`AppError::InvalidOriginalUrl`] naming the failed gate.
    async fn validate(&self, raw: &str) -> Result<(), AppError> {
        if raw.trim().is_empty() {
            return Err(invalid("url is empty"));
        }

        let parsed = Url::parse(raw).map_err(|e| invalid(&format!("url does not parse: {e}")))?;

        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(invalid(&format!(
                "unsupported scheme '{}'",
                parsed.scheme()
            )));
        }

        let host = parsed
            .host_str()
            .ok_or_else(|| invalid("url has no host"))?;

        let port = parsed.port_or_known_default().unwrap_or(443);
        let mut addrs = lookup_host((host, port))
            .await
            .map_err(|e| invalid(&format!("host does not resolve: {e}")))?;
        if addrs.next().is_none() {
            return Err(invalid("host resolves to no addresses"));
        }

        // A refused or 5xx HEAD means the target is down; 4xx (405 is common
        // for HEAD) still proves the origin answers.
        let response = self
            .client
            .head(parsed.as_str())
            .send()
            .await
            .map_err(|e| invalid(&format!("head probe failed: {e}")))?;

        if response.status().is_server_error() {
            return Err(invalid(&format!(
                "head probe returned {}",
                response.status()
            )));
        }

        Ok(())
    }
}

fn invalid(reason: &str) -> AppError {
    AppError::InvalidOriginalUrl {
        reason: reason.to_string(),
    }
}
