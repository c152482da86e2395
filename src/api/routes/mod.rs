//! API Routes
//!
//! Route handlers organized by functionality.

pub mod charts;
pub mod fields;
pub mod health;
pub mod tables;
pub mod visualizations;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::reshape::ChartPayload;

/// `204 No Content` for empty payloads, JSON otherwise
pub(crate) fn payload_response(payload: ChartPayload) -> Response {
    match payload {
        ChartPayload::NoContent => StatusCode::NO_CONTENT.into_response(),
        payload => Json(payload).into_response(),
    }
}
