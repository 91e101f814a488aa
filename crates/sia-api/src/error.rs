//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// API errors. Apart from missing credentials, every failure is
/// reported as HTTP 400 with a plain-text body; the surface does not
/// distinguish not-found from malformed input.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Malformed path segment, query, or body.
    #[error("{0}")]
    BadRequest(String),

    /// Missing or wrong credentials.
    #[error("unauthorized")]
    Unauthorized,

    /// Query failure from the explorer core.
    #[error(transparent)]
    Explorer(#[from] sia_explorer::ExplorerError),

    /// An external collaborator (txpool, syncer) rejected the request
    /// or is not connected.
    #[error("{0}")]
    Unavailable(String),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        ApiError::BadRequest(msg.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            _ => StatusCode::BAD_REQUEST,
        };
        (status, self.to_string()).into_response()
    }
}

/// Result type for API handlers.
pub type ApiResult<T> = Result<T, ApiError>;
