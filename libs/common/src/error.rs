//! Custom error types for the common library
//!
//! This module defines the error type returned by every call made against
//! the remote clinic API, along with configuration and session failures.

use reqwest::Error as ReqwestError;
use thiserror::Error;

pub use reqwest::StatusCode;

/// Custom error type for remote API operations
#[derive(Error, Debug)]
pub enum ApiError {
    /// Transport failure: connection refused, timeout, TLS, ...
    #[error("Network error: {0}")]
    Network(#[source] ReqwestError),

    /// The API answered with a non-success status
    #[error("API returned {status}: {message}")]
    Status { status: StatusCode, message: String },

    /// The response body did not match the expected shape
    #[error("Failed to decode API response: {0}")]
    Decode(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// No active session, or the API rejected the bearer token
    #[error("Unauthorized")]
    Unauthorized,

    /// Reading, writing or parsing the persisted session failed
    #[error("Session error: {0}")]
    Session(String),
}

impl ApiError {
    /// HTTP status associated with the error, when there is one
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Unauthorized => Some(StatusCode::UNAUTHORIZED),
            ApiError::Network(e) => e.status(),
            _ => None,
        }
    }

    /// Whether retrying the same action could succeed
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::Network(_) => true,
            ApiError::Status { status, .. } => status.is_server_error(),
            _ => false,
        }
    }
}

impl From<ReqwestError> for ApiError {
    fn from(err: ReqwestError) -> Self {
        if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else {
            ApiError::Network(err)
        }
    }
}

/// Type alias for Result with ApiError
pub type ApiResult<T> = Result<T, ApiError>;
