//! Table Routes
//!
//! - POST /api/v1/tables - One page of a saved search
//! - GET /api/v1/saved-searches - Saved search titles

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;

use crate::api::dto::SavedSearchesResponse;
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::query::TableRequest;
use crate::reshape::TablePage;

/// POST /api/v1/tables
pub async fn table_data(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TableRequest>,
) -> ApiResult<Json<TablePage>> {
    if req.size == 0 {
        return Err(ApiError::Validation("size must be positive".to_string()));
    }

    let page = state.executor.table_data(&req).await?;
    Ok(Json(page))
}

/// GET /api/v1/saved-searches
///
/// `204 No Content` when nothing is saved.
pub async fn saved_searches(State(state): State<Arc<AppState>>) -> ApiResult<Response> {
    let titles = state.executor.saved_search_titles().await?;
    if titles.is_empty() {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }
    Ok(Json(SavedSearchesResponse {
        saved_searches: titles,
    })
    .into_response())
}
