//! Visualization Routes
//!
//! - POST /api/v1/visualizations/bar - Bar chart with optional breakdown

use axum::{extract::State, response::Response, Json};
use std::sync::Arc;

use crate::api::error::ApiResult;
use crate::api::routes::payload_response;
use crate::api::state::AppState;
use crate::query::VisualizationRequest;

/// POST /api/v1/visualizations/bar
pub async fn bar_chart(
    State(state): State<Arc<AppState>>,
    Json(req): Json<VisualizationRequest>,
) -> ApiResult<Response> {
    let payload = state.executor.bar_visualization(&req).await?;
    Ok(payload_response(payload))
}
