//! Wire types exchanged with the siteverify endpoint.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::error_codes;

/// Verification request built from an inbound HTTP request.
///
/// The secret is not part of this type; the client adds it when the body is
/// serialized.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationRequest {
    /// Token produced by the widget
    pub response: String,

    /// End-user IP address
    #[serde(rename = "remoteip")]
    pub remote_ip: String,

    /// Key the remote uses to deduplicate repeated verifications
    pub idempotency_key: String,
}

impl VerificationRequest {
    pub fn new(
        response: impl Into<String>,
        remote_ip: impl Into<String>,
        idempotency_key: impl Into<String>,
    ) -> Self {
        Self {
            response: response.into(),
            remote_ip: remote_ip.into(),
            idempotency_key: idempotency_key.into(),
        }
    }
}

/// Decoded siteverify response.
///
/// Failure responses usually leave out `challenge_ts` and `hostname`, so every
/// field falls back to an empty value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationResponse {
    #[serde(default)]
    pub success: bool,

    /// When the challenge was solved
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub challenge_ts: Option<DateTime<Utc>>,

    /// Hostname of the site the challenge was solved on
    #[serde(default)]
    pub hostname: String,

    #[serde(default, rename = "error-codes")]
    pub error_codes: Vec<ErrorCode>,

    /// Action label set on the widget
    #[serde(default)]
    pub action: String,

    /// Customer data passed through the widget
    #[serde(default)]
    pub cdata: String,
}

impl VerificationResponse {
    /// Classify the reported error codes. `None` when the token was accepted.
    pub fn classification(&self) -> Option<Classification> {
        if self.success {
            None
        } else {
            Some(Classification::from_codes(&self.error_codes))
        }
    }
}

/// Error code reported by siteverify.
///
/// Codes outside the documented set are kept verbatim in `Unknown` so a new
/// code on the remote side never breaks decoding.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ErrorCode {
    MissingInputSecret,
    InvalidInputSecret,
    MissingInputResponse,
    InvalidInputResponse,
    InvalidWidgetId,
    InvalidParsedSecret,
    BadRequest,
    TimeoutOrDuplicate,
    InternalError,
    Unknown(String),
}

impl ErrorCode {
    pub fn as_str(&self) -> &str {
        match self {
            Self::MissingInputSecret => error_codes::MISSING_INPUT_SECRET,
            Self::InvalidInputSecret => error_codes::INVALID_INPUT_SECRET,
            Self::MissingInputResponse => error_codes::MISSING_INPUT_RESPONSE,
            Self::InvalidInputResponse => error_codes::INVALID_INPUT_RESPONSE,
            Self::InvalidWidgetId => error_codes::INVALID_WIDGET_ID,
            Self::InvalidParsedSecret => error_codes::INVALID_PARSED_SECRET,
            Self::BadRequest => error_codes::BAD_REQUEST,
            Self::TimeoutOrDuplicate => error_codes::TIMEOUT_OR_DUPLICATE,
            Self::InternalError => error_codes::INTERNAL_ERROR,
            Self::Unknown(code) => code,
        }
    }

    /// Codes that point at a malformed call rather than a bad token
    fn is_request_error(&self) -> bool {
        matches!(
            self,
            Self::BadRequest
                | Self::MissingInputSecret
                | Self::InvalidInputSecret
                | Self::InvalidParsedSecret
                | Self::InvalidWidgetId
                | Self::MissingInputResponse
        )
    }
}

impl From<&str> for ErrorCode {
    fn from(value: &str) -> Self {
        match value {
            error_codes::MISSING_INPUT_SECRET => Self::MissingInputSecret,
            error_codes::INVALID_INPUT_SECRET => Self::InvalidInputSecret,
            error_codes::MISSING_INPUT_RESPONSE => Self::MissingInputResponse,
            error_codes::INVALID_INPUT_RESPONSE => Self::InvalidInputResponse,
            error_codes::INVALID_WIDGET_ID => Self::InvalidWidgetId,
            error_codes::INVALID_PARSED_SECRET => Self::InvalidParsedSecret,
            error_codes::BAD_REQUEST => Self::BadRequest,
            error_codes::TIMEOUT_OR_DUPLICATE => Self::TimeoutOrDuplicate,
            error_codes::INTERNAL_ERROR => Self::InternalError,
            other => Self::Unknown(other.to_string()),
        }
    }
}

impl From<String> for ErrorCode {
    fn from(value: String) -> Self {
        match Self::from(value.as_str()) {
            Self::Unknown(_) => Self::Unknown(value),
            known => known,
        }
    }
}

impl From<ErrorCode> for String {
    fn from(code: ErrorCode) -> Self {
        match code {
            ErrorCode::Unknown(code) => code,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Caller-meaningful category for a failed verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Classification {
    /// Remote reported `internal-error`
    ServerError,
    /// Token was invalid, expired or already redeemed
    ValidationFailed,
    /// Call itself was malformed: bad secret, bad widget, missing token
    InvalidRequest,
    /// No rule matched
    Unhandled,
}

impl Classification {
    /// Map a code list to a category. Rules are checked in order and the
    /// first match wins.
    pub fn from_codes(codes: &[ErrorCode]) -> Self {
        let has = |code: &ErrorCode| codes.contains(code);

        if has(&ErrorCode::InternalError) {
            Self::ServerError
        } else if has(&ErrorCode::InvalidInputResponse) || has(&ErrorCode::TimeoutOrDuplicate) {
            Self::ValidationFailed
        } else if codes.iter().any(ErrorCode::is_request_error) {
            Self::InvalidRequest
        } else {
            Self::Unhandled
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::ServerError => "turnstile server error",
            Self::ValidationFailed => "invalid, duplicate or expired response",
            Self::InvalidRequest => "invalid verification request",
            Self::Unhandled => "unhandled turnstile error",
        };
        f.write_str(text)
    }
}
