//! Field Routes
//!
//! Field discovery for the filter editor.
//!
//! - GET /api/v1/fields - All known fields
//! - GET /api/v1/fields/operators?field= - Operator menu for a field
//! - GET /api/v1/fields/values?field= - Distinct values of a field

use axum::{
    extract::{Query, State},
    Json,
};
use std::sync::Arc;

use crate::api::dto::{FieldQuery, FieldValuesResponse, FieldsResponse};
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::engine::FieldOperators;

fn required_field(query: FieldQuery) -> ApiResult<String> {
    query
        .field
        .filter(|f| !f.trim().is_empty())
        .ok_or_else(|| ApiError::Validation("missing 'field' parameter".to_string()))
}

/// GET /api/v1/fields
pub async fn list_fields(State(state): State<Arc<AppState>>) -> Json<FieldsResponse> {
    Json(FieldsResponse {
        fields: state.catalog.fields().await,
    })
}

/// GET /api/v1/fields/operators?field=
pub async fn field_operators(
    State(state): State<Arc<AppState>>,
    Query(query): Query<FieldQuery>,
) -> ApiResult<Json<FieldOperators>> {
    let field = required_field(query)?;
    state
        .catalog
        .operators(&field)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("field '{}'", field)))
}

/// GET /api/v1/fields/values?field=
pub async fn field_values(
    State(state): State<Arc<AppState>>,
    Query(query): Query<FieldQuery>,
) -> ApiResult<Json<FieldValuesResponse>> {
    let field = required_field(query)?;
    let values = state.catalog.field_values(&field).await;
    Ok(Json(FieldValuesResponse { field, values }))
}
