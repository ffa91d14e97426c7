//! Mapping from handler failures to HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::storage::StorageError;

/// Body returned for every storage-side failure. The cause stays in the logs.
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

/// Failure raised by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The `message` field is missing or not a JSON string.
    #[error("Message must be a string")]
    InvalidMessage,

    /// A conversation id is not a usable number.
    #[error("Invalid conversation ID")]
    InvalidConversationId,

    /// The storage layer failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

impl ApiError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidMessage | Self::InvalidConversationId => StatusCode::BAD_REQUEST,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message exposed to the caller.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::Storage(_) => INTERNAL_ERROR_MESSAGE.to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, "rejected request");
        }

        let body = Json(json!({ "error": self.public_message() }));
        (status, body).into_response()
    }
}

/// Result type for API handlers.
pub type ApiResult<T> = Result<T, ApiError>;
