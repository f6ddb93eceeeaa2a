//! Panic recovery middleware.
//!
//! A panicking handler must not tear down the connection silently: the
//! payload and a backtrace are logged at `ERROR` and the client gets the
//! standard `internal_error` body. Sits under the tracing layer so the
//! recovered 500 is also recorded against the request.

use std::any::Any;
use std::backtrace::Backtrace;

use axum::Json;
use axum::body::Body;
use axum::http::{Response, StatusCode};
use axum::response::IntoResponse;
use tower_http::catch_panic::CatchPanicLayer;

use crate::error::ErrorBody;

type PanicHandler = fn(Box<dyn Any + Send + 'static>) -> Response<Body>;

pub fn layer() -> CatchPanicLayer<PanicHandler> {
    CatchPanicLayer::custom(handle_panic as PanicHandler)
}

fn handle_panic(payload: Box<dyn Any + Send + 'static>) -> Response<Body> {
    let detail = if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else {
        "non-string panic payload".to_string()
    };

    tracing::error!(
        panic = %detail,
        backtrace = %Backtrace::force_capture(),
        "request handler panicked"
    );

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorBody {
            error: "internal_error",
            error_description: "internal error".to_string(),
        }),
    )
        .into_response()
}
