//! Handlers for liveness and readiness endpoints.

use std::time::Duration;

use axum::{Json, extract::State, http::StatusCode};
use serde_json::{Value, json};

use crate::api::dto::health::{CheckStatus, HealthChecks, HealthResponse};
use crate::state::AppState;

/// Time budget for each dependency probe.
const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Liveness check: the process accepts connections.
///
/// # Endpoint
///
/// `GET /`
pub async fn liveness_handler() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Readiness check with dependency probes.
///
/// # Endpoint
///
/// `GET /health/ready`
///
/// # Response Codes
///
/// - **200 OK**: database and cache both answer
/// - **503 Service Unavailable**: any probe fails or times out
pub async fn readiness_handler(
    State(state): State<AppState>,
) -> Result<Json<HealthResponse>, (StatusCode, Json<HealthResponse>)> {
    let database = check_database(&state).await;
    let cache = check_cache(&state).await;

    let all_healthy = database.is_ok() && cache.is_ok();

    let response = HealthResponse {
        status: if all_healthy { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        checks: HealthChecks { database, cache },
    };

    if all_healthy {
        Ok(Json(response))
    } else {
        Err((StatusCode::SERVICE_UNAVAILABLE, Json(response)))
    }
}

async fn check_database(state: &AppState) -> CheckStatus {
    let probe = sqlx::query("SELECT 1").execute(&state.db);

    match tokio::time::timeout(PROBE_TIMEOUT, probe).await {
        Ok(Ok(_)) => CheckStatus::ok("connected"),
        Ok(Err(e)) => CheckStatus::error(format!("database error: {e}")),
        Err(_) => CheckStatus::error("database probe timed out"),
    }
}

async fn check_cache(state: &AppState) -> CheckStatus {
    match tokio::time::timeout(PROBE_TIMEOUT, state.cache.health_check()).await {
        Ok(true) => CheckStatus::ok("cache answering"),
        Ok(false) => CheckStatus::error("cache not answering"),
        Err(_) => CheckStatus::error("cache probe timed out"),
    }
}
