//! Error types for vax-cc

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Which external hop of the coding pipeline failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceHop {
    /// pyCrossVA transform service
    Transform,
    /// InterVA5 algorithm service
    Algorithm,
}

impl std::fmt::Display for ServiceHop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceHop::Transform => write!(f, "transform service"),
            ServiceHop::Algorithm => write!(f, "algorithm service"),
        }
    }
}

/// Coding pipeline error type.
///
/// Any of these is fatal to the enclosing batch: the batch is marked
/// failed and no Cause/Issue rows from the run become visible.
#[derive(Debug, Error)]
pub enum CodingError {
    /// External hop unreachable, non-success status, or malformed body
    #[error("{hop} failure: {detail}")]
    Service { hop: ServiceHop, detail: String },

    /// A response identifier has no matching input record. Indicates
    /// client/service desynchronization; silently misattributing a cause
    /// to the wrong record would be a data-integrity failure, so this is
    /// surfaced loudly instead.
    #[error("no input record for response identifier {offset} (batch of {record_count})")]
    Correlation { offset: String, record_count: usize },

    /// Algorithm settings value outside its allowed set
    #[error("Configuration error: {0}")]
    Config(String),

    /// Record translation failure (CSV or JSON shaping)
    #[error("Translation error: {0}")]
    Translation(String),

    /// Database operation error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Shared vax-common error
    #[error("Common error: {0}")]
    Common(#[from] vax_common::Error),
}

impl CodingError {
    pub fn service(hop: ServiceHop, detail: impl Into<String>) -> Self {
        CodingError::Service {
            hop,
            detail: detail.into(),
        }
    }
}

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Upstream coding service failure (502)
    #[error(transparent)]
    Coding(#[from] CodingError),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// vax-common error
    #[error("Common error: {0}")]
    Common(#[from] vax_common::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Coding(ref err) => {
                let status = match err {
                    CodingError::Service { .. } => StatusCode::BAD_GATEWAY,
                    _ => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, "CODING_ERROR", err.to_string())
            }
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg),
            ApiError::Common(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "COMMON_ERROR",
                err.to_string(),
            ),
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
