//! Custom error types for entity searches

use std::sync::Arc;

use common::error::ApiError;
use thiserror::Error;

/// Custom error type for search operations
///
/// Cloneable so a session can keep the last failure around for display
/// while also handing it to the caller.
#[derive(Error, Debug, Clone)]
pub enum SearchError {
    /// The backend could not be reached, refused the request, or answered
    /// with something that is not a result page
    #[error("Search request failed: {0}")]
    Network(#[source] Arc<ApiError>),

    /// The filters are malformed and were never sent
    #[error("Invalid search: {0}")]
    Validation(String),
}

impl SearchError {
    /// The underlying API error, for network failures
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            SearchError::Network(e) => Some(e),
            SearchError::Validation(_) => None,
        }
    }
}

impl From<ApiError> for SearchError {
    fn from(err: ApiError) -> Self {
        SearchError::Network(Arc::new(err))
    }
}

/// Type alias for Result with SearchError
pub type SearchResult<T> = Result<T, SearchError>;
