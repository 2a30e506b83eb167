use reqwest::StatusCode;
use thiserror::Error;

use crate::domain::errors::DomainError;

/// Errors that can occur when calling the Streams REST API
#[derive(Error, Debug)]
pub enum StreamsApiError {
    /// Invalid request parameters (HTTP 400)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Missing or rejected credentials (HTTP 401)
    #[error("Authentication failed - check the user name, password or token")]
    Unauthorized,

    /// Forbidden - permission denied (HTTP 403)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Resource not found (HTTP 404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Conflict with the current state of a resource (HTTP 409)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Rate limit exceeded (HTTP 429)
    #[error("Rate limit exceeded - too many requests")]
    RateLimitExceeded,

    /// Server error (HTTP 5xx)
    #[error("Server error ({0}): {1}")]
    ServerError(StatusCode, String),

    /// Network or connection error
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Request timeout
    #[error("Request timeout")]
    Timeout,

    /// Response did not carry a member we rely on
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Unknown or unexpected status
    #[error("Unknown error ({0}): {1}")]
    UnknownError(StatusCode, String),
}

impl StreamsApiError {
    /// Classify a non-success status code.
    pub fn from_status(status: StatusCode, body: String) -> Self {
        match status.as_u16() {
            400 => Self::InvalidRequest(body),
            401 => Self::Unauthorized,
            403 => Self::Forbidden(body),
            404 => Self::NotFound(body),
            409 => Self::Conflict(body),
            429 => Self::RateLimitExceeded,
            408 | 504 => Self::Timeout,
            500..=599 => Self::ServerError(status, body),
            _ => Self::UnknownError(status, body),
        }
    }

    /// Returns true if this error is transient and should be retried
    pub fn is_transient(&self) -> bool {
        match self {
            Self::RateLimitExceeded | Self::ServerError(_, _) | Self::Timeout => true,
            Self::NetworkError(err) => err.is_timeout() || err.is_connect() || err.is_request(),
            _ => false,
        }
    }

    /// Returns true if this is a permanent error that should not be retried
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            Self::InvalidRequest(_)
                | Self::Unauthorized
                | Self::Forbidden(_)
                | Self::NotFound(_)
                | Self::Conflict(_)
        )
    }
}

impl From<StreamsApiError> for DomainError {
    fn from(err: StreamsApiError) -> Self {
        DomainError::Api {
            transient: err.is_transient(),
            message: err.to_string(),
        }
    }
}
