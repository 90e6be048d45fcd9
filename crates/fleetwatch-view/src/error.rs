//! Error types for the view binding.
//!
//! [`ViewError`] converts into an Axum HTTP response via its
//! [`IntoResponse`](axum::response::IntoResponse) implementation.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::session::SessionError;

/// Errors that can occur in the view API layer.
#[derive(Debug, thiserror::Error)]
pub enum ViewError {
    /// The requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// The request was malformed.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The view session is no longer running.
    #[error("view session closed")]
    SessionClosed,
}

impl From<SessionError> for ViewError {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::Closed => Self::SessionClosed,
        }
    }
}

impl IntoResponse for ViewError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::SessionClosed => StatusCode::SERVICE_UNAVAILABLE,
        };

        let body = serde_json::json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}
