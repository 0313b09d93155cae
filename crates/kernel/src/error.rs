//! Application error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Application errors.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("unauthorized")]
    Unauthorized,

    #[error("{0}")]
    BadRequest(String),

    #[error("Error processing image")]
    Processing(#[source] anyhow::Error),

    #[error("Error deleting image")]
    Removal(#[source] anyhow::Error),

    #[error("internal server error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Shorthand for a client error with a message.
    pub fn bad_request(message: impl Into<String>) -> Self {
        AppError::BadRequest(message.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Processing(_) | AppError::Removal(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        // Source errors stay in the log, the caller only sees the class.
        match &self {
            AppError::Processing(e) => {
                tracing::warn!(error = %format!("{e:#}"), "image processing failed");
            }
            AppError::Removal(e) => {
                tracing::warn!(error = %format!("{e:#}"), "image removal failed");
            }
            AppError::Internal(e) => {
                tracing::error!(error = %format!("{e:#}"), "internal server error");
            }
            _ => {}
        }

        (status, self.to_string()).into_response()
    }
}

/// Result type alias using AppError.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_per_class() {
        assert_eq!(
            AppError::Unauthorized.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::bad_request("Error: No File Selected!")
                .into_response()
                .status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Processing(anyhow::anyhow!("bad bytes"))
                .into_response()
                .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::Removal(anyhow::anyhow!("gone"))
                .into_response()
                .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn processing_message_hides_source() {
        let err = AppError::Processing(anyhow::anyhow!("/srv/uploads/secret/path"));
        assert_eq!(err.to_string(), "Error processing image");
    }
}
