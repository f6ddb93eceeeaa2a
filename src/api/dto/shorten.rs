//! DTOs for the shorten endpoint.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::domain::entities::ShortUrl;

/// Request to shorten a single URL.
#[derive(Debug, Deserialize, Validate)]
pub struct ShortenRequest {
    /// The original URL (must be syntactically valid HTTP/HTTPS; liveness
    /// is probed separately).
    #[validate(url(message = "invalid URL format"))]
    pub original_url: String,
}

/// The stored record, echoed back on both fresh and repeated shortens.
#[derive(Debug, Serialize)]
pub struct ShortenResponse {
    pub short_code: String,
    pub original_url: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ShortUrl> for ShortenResponse {
    fn from(record: ShortUrl) -> Self {
        Self {
            short_code: record.short_code,
            original_url: record.original_url,
            status: record.status.as_str().to_string(),
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}
