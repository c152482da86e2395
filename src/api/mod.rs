//! dashquery REST API
//!
//! HTTP API layer over the query engine, built with Axum.
//!
//! # Endpoints
//!
//! ## Charts
//! - `POST /api/v1/charts` - Chart data (bar, pie, donut, line, area)
//! - `POST /api/v1/visualizations/bar` - Bar/breakdown visualization
//!
//! ## Tables
//! - `POST /api/v1/tables` - Table page from a saved search
//! - `GET /api/v1/saved-searches` - Saved search titles
//!
//! ## Fields
//! - `GET /api/v1/fields` - All known fields
//! - `GET /api/v1/fields/operators?field=` - Operator menu for a field
//! - `GET /api/v1/fields/values?field=` - Distinct values of a field
//!
//! ## Health
//! - `GET /health/live` - Liveness probe
//! - `GET /health/ready` - Readiness probe
//! - `GET /health` - Full health status
//!
//! Chart endpoints answer `204 No Content` when the engine returned no
//! aggregations.
//!
//! # Example
//!
//! ```rust,ignore
//! use dashquery::api::{serve, AppState};
//! use dashquery::config::Config;
//! use dashquery::engine::FieldCatalog;
//! use dashquery::query::QueryExecutor;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load_default();
//!     let router = Arc::new(config.engine.router()?);
//!     let executor = Arc::new(QueryExecutor::new(router.clone(), config.query_context()?));
//!     let catalog = Arc::new(FieldCatalog::new(
//!         router,
//!         config.fields.index_patterns.clone(),
//!         config.fields.cache_ttl(),
//!     ));
//!
//!     serve(AppState::new(executor, catalog, config.api.clone())).await?;
//!     Ok(())
//! }
//! ```

pub mod dto;
pub mod error;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use state::AppState;

use axum::{
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ApiConfig;

/// Build the API router with all routes and middleware
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        // Chart routes
        .route("/charts", post(routes::charts::chart_data))
        .route("/visualizations/bar", post(routes::visualizations::bar_chart))
        // Table routes
        .route("/tables", post(routes::tables::table_data))
        .route("/saved-searches", get(routes::tables::saved_searches))
        // Field routes
        .route("/fields", get(routes::fields::list_fields))
        .route("/fields/operators", get(routes::fields::field_operators))
        .route("/fields/values", get(routes::fields::field_values));

    let health_routes = Router::new()
        .route("/live", get(routes::health::liveness))
        .route("/ready", get(routes::health::readiness))
        .route("/", get(routes::health::full_health));

    let cors = cors_layer(&state.config);
    let timeout = TimeoutLayer::new(state.config.request_timeout());
    let shared_state = Arc::new(state);

    Router::new()
        .nest("/api/v1", api_routes)
        .nest("/health", health_routes)
        .layer(TraceLayer::new_for_http())
        .layer(timeout)
        .layer(cors)
        .with_state(shared_state)
}

/// Permissive without configured origins
fn cors_layer(config: &ApiConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    if origins.is_empty() {
        return CorsLayer::permissive();
    }

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Start the API server
pub async fn serve(state: AppState) -> Result<(), ApiError> {
    let addr = state.config.addr();
    let router = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("dashquery API listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ApiError::Internal(format!("Server error: {}", e)))?;

    tracing::info!("dashquery API shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
