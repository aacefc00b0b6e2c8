//! Error types for the Chronoatlas HTTP API.
//!
//! [`ApiError`] unifies handler failures into a single enum that converts
//! into an Axum response with a `{ "error", "status" }` JSON body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Errors that can occur in the API layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// A query parameter or request body was missing or malformed.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// A newer analysis request replaced this one before it finished.
    #[error("analysis request {token} superseded by request {latest}")]
    Superseded {
        /// The discarded request's token.
        token: u64,
        /// The newest issued token.
        latest: u64,
    },
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidQuery(_) => StatusCode::BAD_REQUEST,
            Self::Superseded { .. } => StatusCode::CONFLICT,
        };

        let body = serde_json::json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}
