//! Handler for the shorten endpoint.

use axum::{Extension, Json, extract::State};
use validator::Validate;

use crate::api::dto::shorten::{ShortenRequest, ShortenResponse};
use crate::domain::RequestScope;
use crate::error::AppError;
use crate::state::AppState;

/// Shortens a URL.
///
/// # Endpoint
///
/// `POST /api/public/v1/shorten`
///
/// # Request Flow
///
/// 1. Syntactic validation of the body
/// 2. Liveness validation (DNS, HEAD probe)
/// 3. Create the record (idempotent on the original URL), emitting a
///    metadata crawl request in the same transaction
///
/// # Errors
///
/// Returns 400 `invalid_original_url` when any validation gate fails.
pub async fn shorten_handler(
    State(state): State<AppState>,
    Extension(scope): Extension<RequestScope>,
    Json(request): Json<ShortenRequest>,
) -> Result<Json<ShortenResponse>, AppError> {
    request.validate()?;
    state.url_validator.validate(&request.original_url).await?;

    let record = state
        .short_urls
        .shorten(&scope, &request.original_url)
        .await?;

    tracing::info!(
        short_code = %record.short_code,
        correlation_id = %scope.correlation_id,
        "url shortened"
    );

    Ok(Json(record.into()))
}
