//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

/// Errors returned by handlers.
///
/// Authentication failures carry no detail, so a client cannot tell an
/// unknown user from a wrong password.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request did not authenticate.
    #[error("not authenticated")]
    Unauthorized,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
        };

        (
            status,
            Json(ErrorBody {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}
