//! Application error taxonomy and HTTP mapping.
//!
//! Every error carries a stable machine code surfaced to clients as
//! `{"error": "<code>", "error_description": "<human text>"}`. Anything
//! uncategorized collapses into `internal_error` with HTTP 500.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::crawler::CrawlError;

/// JSON error body returned by every endpoint.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub error_description: String,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// The submitted URL failed validation (parse, scheme, DNS, HEAD probe).
    #[error("invalid original url: {reason}")]
    InvalidOriginalUrl { reason: String },

    /// No short URL row exists for the given code.
    #[error("short url not found: {short_code}")]
    UrlNotFound { short_code: String },

    /// The short URL exists but its status is not ACTIVE.
    #[error("short url is not active: {short_code}")]
    InactiveUrl { short_code: String },

    /// Generated short code collided with an existing row.
    #[error("short code already taken: {short_code}")]
    CodeCollision { short_code: String },

    /// Metadata crawl failed; no database mutation happened.
    #[error(transparent)]
    Crawl(#[from] CrawlError),

    /// Broker publish failed; handled by the producer's retry accounting.
    #[error("publish failed: {0}")]
    PublishFailed(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Stable machine code for the HTTP body.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidOriginalUrl { .. } => "invalid_original_url",
            Self::UrlNotFound { .. } => "url_not_found",
            Self::InactiveUrl { .. } => "inactive_url",
            Self::Crawl(_) => "crawl_failed",
            Self::CodeCollision { .. }
            | Self::PublishFailed(_)
            | Self::Database(_)
            | Self::Internal(_) => "internal_error",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::InvalidOriginalUrl { .. } | Self::InactiveUrl { .. } => StatusCode::BAD_REQUEST,
            Self::UrlNotFound { .. } => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Internal detail stays in the logs, not in the client body.
        let description = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "request failed");
            "internal error".to_string()
        } else {
            self.to_string()
        };

        let body = ErrorBody {
            error: self.code(),
            error_description: description,
        };

        (status, Json(body)).into_response()
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::InvalidOriginalUrl {
            reason: errors.to_string(),
        }
    }
}

/// True when the database failure can disappear on retry: Postgres
/// serialization / deadlock codes, or transient transport conditions.
pub fn is_retryable_db_error(e: &sqlx::Error) -> bool {
    if let Some(db) = e.as_database_error()
        && matches!(db.code().as_deref(), Some("40001") | Some("40P01"))
    {
        return true;
    }

    let text = e.to_string().to_lowercase();
    ["timeout", "broken pipe", "connection reset"]
        .iter()
        .any(|needle| text.contains(needle))
}

/// Retryable classifier lifted to [`AppError`], used by the transaction wrapper.
pub fn is_retryable(e: &AppError) -> bool {
    match e {
        AppError::Database(inner) => is_retryable_db_error(inner),
        _ => false,
    }
}

/// True when the insert bounced off the `short_urls` primary key, meaning the
/// generated code is already taken and the caller should roll a new one.
pub fn is_code_collision(e: &sqlx::Error) -> bool {
    let Some(db_err) = e.as_database_error() else {
        return false;
    };

    if !db_err.is_unique_violation() {
        return false;
    }

    matches!(db_err.constraint(), Some("short_urls_pkey"))
}
