//! Error types for the storefront server
//!
//! Provides unified error handling using thiserror.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Backend Error ==
/// Failure of a single call to the commerce backend.
#[derive(Error, Debug)]
pub enum BackendError {
    /// The backend answered 404 for a single-resource lookup
    #[error("Not found: {0}")]
    NotFound(String),

    /// Any other non-2xx answer
    #[error("Backend returned {status}: {message}")]
    Status { status: u16, message: String },

    /// Connection, TLS or protocol failure
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The body was not the JSON we expected
    #[error("Invalid response body: {0}")]
    Decode(String),

    /// The call did not finish within the configured loader timeout
    #[error("Backend call timed out after {0:?}")]
    Timeout(Duration),

    #[error("{0}")]
    Other(String),
}

impl BackendError {
    /// Status code the backend answered with, if it answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            BackendError::NotFound(_) => Some(404),
            BackendError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

// == Fetch Error ==
/// Outcome of a failed cache lookup.
///
/// Cheap to clone: every caller attached to one in-flight request receives
/// the same failure.
#[derive(Error, Debug, Clone)]
pub enum FetchError {
    /// Caller passed an empty key
    #[error("Cache key must not be empty")]
    InvalidKey,

    /// The loader for `key` failed
    #[error("Loader failed for '{key}': {source}")]
    LoaderFailure {
        key: String,
        #[source]
        source: Arc<BackendError>,
    },
}

impl FetchError {
    pub fn loader_failure(key: impl Into<String>, source: BackendError) -> Self {
        FetchError::LoaderFailure {
            key: key.into(),
            source: Arc::new(source),
        }
    }

    /// True when the underlying backend call answered 404.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            FetchError::LoaderFailure { source, .. } if matches!(**source, BackendError::NotFound(_))
        )
    }

    /// The backend failure behind a `LoaderFailure`.
    pub fn backend(&self) -> Option<&BackendError> {
        match self {
            FetchError::InvalidKey => None,
            FetchError::LoaderFailure { source, .. } => Some(source.as_ref()),
        }
    }
}

// == Cart Error ==
/// Failures of cart session operations.
#[derive(Error, Debug)]
pub enum CartError {
    #[error("Quantity must be greater than zero")]
    InvalidQuantity,

    #[error(transparent)]
    Backend(#[from] BackendError),

    /// The persistent identifier store could not be read or written
    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<std::io::Error> for CartError {
    fn from(err: std::io::Error) -> Self {
        CartError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for CartError {
    fn from(err: serde_json::Error) -> Self {
        CartError::Storage(err.to_string())
    }
}

// == App Error ==
/// HTTP-facing error type for the storefront server.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found
    #[error("{0}")]
    NotFound(String),

    /// Invalid request data
    #[error("{0}")]
    InvalidRequest(String),

    /// The commerce backend failed; carries the status to forward
    #[error("{message}")]
    Upstream { status: StatusCode, message: String },

    /// Missing or invalid server configuration
    #[error("{0}")]
    Configuration(String),

    /// Internal server error
    #[error("{0}")]
    Internal(String),
}

impl From<CartError> for AppError {
    fn from(err: CartError) -> Self {
        match err {
            CartError::InvalidQuantity => AppError::InvalidRequest(err.to_string()),
            CartError::Backend(source) => match source
                .status()
                .and_then(|code| StatusCode::from_u16(code).ok())
            {
                Some(status) => AppError::Upstream {
                    status,
                    message: source.to_string(),
                },
                None => AppError::Internal(source.to_string()),
            },
            CartError::Storage(_) => AppError::Internal(err.to_string()),
        }
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Upstream { status, .. } => *status,
            AppError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(ErrorResponse::new(self.to_string()));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for HTTP handlers.
pub type Result<T> = std::result::Result<T, AppError>;
