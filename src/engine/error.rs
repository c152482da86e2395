//! Engine transport error types

use thiserror::Error;

/// Errors that can occur when talking to the search engine
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Search engine unavailable: {0}")]
    Unavailable(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Rate limited")]
    RateLimited,

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Failed to decode response: {0}")]
    Decode(String),
}

impl EngineError {
    /// Map a reqwest failure onto the transport taxonomy
    pub(crate) fn from_send(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_connect() {
            Self::Unavailable(e.to_string())
        } else {
            Self::Request(e)
        }
    }

    /// Connection failures, timeouts and rate limiting are worth retrying
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Timeout | Self::RateLimited)
    }

    /// 404 from the engine
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Api { status: 404, .. })
    }
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable() {
        assert!(EngineError::Timeout.is_retryable());
        assert!(EngineError::Unavailable("refused".into()).is_retryable());
        assert!(!EngineError::Decode("bad json".into()).is_retryable());
        assert!(!EngineError::Api {
            status: 400,
            message: "parse".into()
        }
        .is_retryable());
    }

    #[test]
    fn test_api_error_display() {
        let err = EngineError::Api {
            status: 404,
            message: "index_not_found_exception".into(),
        };
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "API error 404: index_not_found_exception");
    }
}
