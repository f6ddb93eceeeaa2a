//! Handler for short URL redirect.

use axum::{
    Extension,
    extract::{Path, State},
    http::{StatusCode, header},
    response::IntoResponse,
};

use crate::domain::RequestScope;
use crate::error::AppError;
use crate::state::AppState;

/// Redirects a short code to its original URL.
///
/// # Endpoint
///
/// `GET /api/public/v1/redirect/{shortcode}`
///
/// Responds with 301 and a `Location` header so browsers and intermediaries
/// may cache the mapping; codes are never reassigned, which makes the
/// permanent redirect safe.
///
/// # Errors
///
/// Returns 404 `url_not_found` for an unknown code and 400 `inactive_url`
/// for a disabled one.
pub async fn redirect_handler(
    State(state): State<AppState>,
    Extension(scope): Extension<RequestScope>,
    Path(short_code): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let record = state.short_urls.retrieve(&scope, &short_code).await?;

    Ok((
        StatusCode::MOVED_PERMANENTLY,
        [(header::LOCATION, record.original_url)],
    ))
}
