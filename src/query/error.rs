//! Query error types
//!
//! Defines all error conditions that can occur while compiling filters, search
//! requests and chart aggregations, or while executing them against the engine.

use thiserror::Error;

use crate::engine::EngineError;
use crate::time::TimeError;

/// Errors that can occur during query operations
#[derive(Error, Debug)]
pub enum QueryError {
    /// Timestamp or range could not be interpreted
    #[error(transparent)]
    Time(#[from] TimeError),

    /// Filter operator outside the supported set
    #[error("Unsupported operator: {0}")]
    UnsupportedOperator(String),

    /// Filter group condition other than ALL/ANY
    #[error("Unsupported condition: {0}")]
    UnsupportedCondition(String),

    /// Filter value has the wrong shape for its operator
    #[error("Invalid value for '{operator}' on field '{field}': {reason}")]
    InvalidFilterValue {
        field: String,
        operator: String,
        reason: String,
    },

    /// Chart kind needs fields and none were given
    #[error("Fields required for {0} charts")]
    MissingChartFields(String),

    /// Time-series chart requested without a time range
    #[error("Time range required for {0} charts")]
    MissingTimeRange(String),

    /// Page and size put the first hit past the addressable range
    #[error("Page {page} with size {size} is out of range")]
    PageOutOfRange { page: usize, size: usize },

    /// Saved search or other named resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Transport call failed
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),
}

impl QueryError {
    pub(crate) fn invalid_value(
        field: impl Into<String>,
        operator: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidFilterValue {
            field: field.into(),
            operator: operator.into(),
            reason: reason.into(),
        }
    }

    /// Whether the error stems from a malformed request rather than the engine
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::Engine(_) | Self::NotFound(_))
    }
}

/// Result type for query operations
pub type QueryResult<T> = Result<T, QueryError>;
