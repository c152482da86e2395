//! Chart Routes
//!
//! - POST /api/v1/charts - Chart data for bar, pie, donut, line and area panels

use axum::{extract::State, response::Response, Json};
use std::sync::Arc;

use crate::api::error::{ApiError, ApiResult};
use crate::api::routes::payload_response;
use crate::api::state::AppState;
use crate::query::{ChartKind, ChartRequest};

/// POST /api/v1/charts
///
/// Compile the chart request, run it and return the reshaped payload.
pub async fn chart_data(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChartRequest>,
) -> ApiResult<Response> {
    if req.kind == ChartKind::Table {
        return Err(ApiError::Validation(
            "table panels are served by /api/v1/tables".to_string(),
        ));
    }

    let payload = state.executor.chart_data(&req).await?;
    Ok(payload_response(payload))
}
