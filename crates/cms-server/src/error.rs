//! Error types for the HTTP layer.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use cms_core::{CmsError, Disposition};
use serde::Serialize;
use tracing::error;

/// Application-level errors.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error(transparent)]
    Cms(#[from] CmsError),

    #[error("Invalid form data: {0}")]
    BadRequest(String),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorBody {
            error: String,
            code: &'static str,
        }

        let (status, code) = match &self {
            ServerError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ServerError::Cms(err) => match (err, err.disposition()) {
                (CmsError::NotFound(_), _) => (StatusCode::NOT_FOUND, err.code()),
                (CmsError::Unauthorized, _) => (StatusCode::UNAUTHORIZED, err.code()),
                (_, Disposition::Rerender) => (StatusCode::UNPROCESSABLE_ENTITY, err.code()),
                (_, Disposition::Redirect | Disposition::Fatal) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, err.code())
                }
            },
        };

        // Storage and configuration details stay in the logs.
        let message = if status.is_server_error() {
            error!("Request failed: {}", self);
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        let body = ErrorBody {
            error: message,
            code,
        };

        (status, axum::Json(body)).into_response()
    }
}
