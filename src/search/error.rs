//! Error types for search operations

use crate::error::AppError;

/// Result type for search operations
pub type SearchResult<T> = std::result::Result<T, SearchError>;

/// Errors that can occur while talking to the document store or decoding
/// its responses
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// The store could not be reached
    #[error("Transport error: {0}")]
    Transport(String),

    /// The store did not answer within the configured timeout
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// The store answered with a non-success status
    #[error("Document store returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// The response did not have the expected shape
    #[error("Failed to decode response: {0}")]
    Decode(String),

    /// A request body could not be serialized
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Index not found
    #[error("Index not found: {0}")]
    IndexNotFound(String),

    /// Index initialization failed
    #[error("Index initialization failed: {0}")]
    IndexInitFailed(String),

    /// Document indexing failed
    #[error("Document indexing failed: {0}")]
    IndexingFailed(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Cluster did not become healthy
    #[error("Document store unhealthy: {0}")]
    Unhealthy(String),
}

impl SearchError {
    /// Whether the error came from the network rather than from the store
    /// or from decoding
    pub fn is_transport(&self) -> bool {
        matches!(self, SearchError::Transport(_) | SearchError::Timeout(_))
    }
}

impl From<reqwest::Error> for SearchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SearchError::Timeout(err.to_string())
        } else if err.is_decode() {
            SearchError::Decode(err.to_string())
        } else {
            SearchError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for SearchError {
    fn from(err: serde_json::Error) -> Self {
        SearchError::Decode(err.to_string())
    }
}

impl From<SearchError> for AppError {
    fn from(err: SearchError) -> Self {
        match err {
            SearchError::InvalidConfiguration(msg) => AppError::Configuration(msg),
            SearchError::Timeout(msg) => AppError::Timeout(msg),
            SearchError::IndexNotFound(msg) => AppError::NotFound(msg),
            err @ (SearchError::Transport(_)
            | SearchError::Status { .. }
            | SearchError::Unhealthy(_)) => AppError::Integration {
                integration_source: "elasticsearch".to_string(),
                message: err.to_string(),
            },
            err => AppError::Internal(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_status_error_maps_to_bad_gateway() {
        let err = SearchError::Status {
            status: 503,
            body: "unavailable".to_string(),
        };
        let app: AppError = err.into();
        assert_eq!(app.status_code(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_decode_error_maps_to_internal() {
        let app: AppError = SearchError::Decode("missing hits".to_string()).into();
        assert_eq!(app.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_is_transport() {
        assert!(SearchError::Transport("refused".into()).is_transport());
        assert!(SearchError::Timeout("30s".into()).is_transport());
        assert!(!SearchError::Decode("bad".into()).is_transport());
    }
}
