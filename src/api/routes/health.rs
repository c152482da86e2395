//! Health Routes
//!
//! Health check endpoints for monitoring and Kubernetes probes.
//!
//! - GET /health/live - Liveness probe (process is alive)
//! - GET /health/ready - Readiness probe (engine reachable)
//! - GET /health - Full health status

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use crate::api::dto::HealthResponse;
use crate::api::state::AppState;
use crate::engine::EngineError;

/// GET /health/live
///
/// Kubernetes liveness probe.
/// Returns 200 if the process is alive, no dependency checks.
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

/// GET /health/ready
///
/// Kubernetes readiness probe.
/// Returns 200 once the default engine cluster answers.
pub async fn readiness(State(state): State<Arc<AppState>>) -> StatusCode {
    match check_engine_health(&state).await {
        true => StatusCode::OK,
        false => StatusCode::SERVICE_UNAVAILABLE,
    }
}

/// GET /health
///
/// Full health status with component details.
pub async fn full_health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let engine_ok = check_engine_health(&state).await;

    Json(HealthResponse {
        status: if engine_ok { "healthy" } else { "degraded" }.to_string(),
        engine: if engine_ok { "ok" } else { "error" }.to_string(),
        uptime_seconds: state.uptime_seconds(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Any answer from the engine counts, including API errors
async fn check_engine_health(state: &AppState) -> bool {
    let transport = state.executor.router().default_transport();
    match transport.get_alias("*").await {
        Ok(_) | Err(EngineError::Api { .. }) => true,
        Err(e) => {
            tracing::warn!(transport = transport.name(), error = %e, "Engine health check failed");
            false
        }
    }
}
