//! Time handling error types

use thiserror::Error;

/// Errors raised while parsing timestamps or planning histogram intervals
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimeError {
    /// Timestamp matched none of the accepted formats
    #[error("Invalid timestamp '{0}': expected %Y-%m-%dT%H:%M:%S[.fff]Z")]
    InvalidTimestamp(String),

    /// End of the range lies before its start
    #[error("Invalid time range: {start} is after {end}")]
    InvertedRange { start: String, end: String },

    /// Configured UTC offset could not be parsed
    #[error("Invalid UTC offset '{0}': expected +HH:MM or -HH:MM")]
    InvalidOffset(String),
}

/// Result type alias for time operations
pub type TimeResult<T> = Result<T, TimeError>;
