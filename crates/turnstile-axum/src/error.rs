//! Rejections produced by the gate itself.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Message returned when the token is invalid, expired or replayed
pub const VERIFICATION_FAILED_MESSAGE: &str = "turnstile verification failed";

/// A required value could not be read from the inbound request.
///
/// Rendered as-is: the status and message are what the client sees.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ExtractionError {
    pub status: StatusCode,
    pub message: String,
}

impl ExtractionError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }
}

impl IntoResponse for ExtractionError {
    fn into_response(self) -> Response {
        (self.status, self.message).into_response()
    }
}

/// Response for a token the remote refused
pub(crate) fn verification_failed() -> Response {
    (StatusCode::BAD_REQUEST, VERIFICATION_FAILED_MESSAGE).into_response()
}
