//! Data Transfer Objects
//!
//! Request and response types for the API endpoints that are not core types.
//! Chart, visualization and table requests deserialize straight into the
//! query types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::query::SavedSearchTitle;

// ============================================
// FIELD DTOs
// ============================================

/// `?field=` query string
#[derive(Debug, Deserialize)]
pub struct FieldQuery {
    #[serde(default)]
    pub field: Option<String>,
}

/// All known fields
#[derive(Debug, Serialize)]
pub struct FieldsResponse {
    pub fields: Vec<String>,
}

/// Distinct values of one field
#[derive(Debug, Serialize)]
pub struct FieldValuesResponse {
    pub field: String,
    pub values: Vec<Value>,
}

// ============================================
// SAVED SEARCH DTOs
// ============================================

#[derive(Debug, Serialize)]
pub struct SavedSearchesResponse {
    pub saved_searches: Vec<SavedSearchTitle>,
}

// ============================================
// HEALTH DTOs
// ============================================

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Overall status: healthy or degraded
    pub status: String,
    /// Engine status
    pub engine: String,
    /// Server uptime in seconds
    pub uptime_seconds: u64,
    /// Application version
    pub version: String,
}
