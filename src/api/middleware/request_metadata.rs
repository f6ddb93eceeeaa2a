//! Request metadata middleware: required headers and the request scope.

use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::domain::RequestScope;
use crate::state::AppState;

pub const CORRELATION_ID_HEADER: &str = "X-Correlation-ID";
pub const REQUEST_ID_HEADER: &str = "X-Request-ID";

/// Guarantees the configured metadata headers on every request and echoes
/// them on the response, then inserts a [`RequestScope`] extension built
/// from the correlation and request ids.
///
/// A header already present is passed through untouched, so a gateway's
/// correlation id survives the hop. Missing headers get a fresh UUID.
pub async fn request_metadata(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let mut ensured: Vec<(HeaderName, HeaderValue)> = Vec::new();

    for name in state.requires_metadata.iter() {
        let Ok(header_name) = HeaderName::from_bytes(name.as_bytes()) else {
            continue;
        };

        let value = header_str(request.headers(), &header_name)
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let Ok(header_value) = HeaderValue::from_str(&value) else {
            continue;
        };

        request
            .headers_mut()
            .insert(header_name.clone(), header_value.clone());
        ensured.push((header_name, header_value));
    }

    let scope = RequestScope::new(
        scope_field(request.headers(), CORRELATION_ID_HEADER),
        scope_field(request.headers(), REQUEST_ID_HEADER),
    );
    request.extensions_mut().insert(scope);

    let mut response = next.run(request).await;

    for (name, value) in ensured {
        response.headers_mut().insert(name, value);
    }

    response
}

fn header_str<'a>(headers: &'a HeaderMap, name: &HeaderName) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
}

/// Reads a scope field off the (already ensured) headers; generates one if
/// the header was left out of `REQUIRES_METADATA` entirely.
fn scope_field(headers: &HeaderMap, name: &'static str) -> String {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}
