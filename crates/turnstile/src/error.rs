//! Errors produced by a verification call.

use thiserror::Error;

use crate::types::{Classification, ErrorCode, VerificationResponse};

/// Errors returned by [`Verifier::verify`](crate::Verifier::verify)
#[derive(Debug, Error)]
pub enum VerifyError {
    /// Remote answered `success: false`; the decoded response is kept
    #[error("{kind}: [{}]", join_codes(&.response.error_codes))]
    Rejected {
        kind: Classification,
        response: Box<VerificationResponse>,
    },

    /// Request body could not be encoded
    #[error("can not serialize verification request")]
    Serialize(#[source] serde_json::Error),

    /// Request could not be sent or the body could not be read
    #[error("error sending verification request")]
    Transport(#[source] reqwest::Error),

    /// Response body was not a verification response
    #[error("can not decode verification response")]
    Decode(#[source] serde_json::Error),
}

impl VerifyError {
    /// Build the rejection for a decoded `success: false` response
    pub fn rejected(response: VerificationResponse) -> Self {
        Self::Rejected {
            kind: Classification::from_codes(&response.error_codes),
            response: Box::new(response),
        }
    }

    /// Category of a rejection, `None` for local failures
    pub fn classification(&self) -> Option<Classification> {
        match self {
            Self::Rejected { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// The token was invalid, expired or replayed
    pub fn is_validation_failed(&self) -> bool {
        self.classification() == Some(Classification::ValidationFailed)
    }

    /// The call was malformed (secret, widget, missing token)
    pub fn is_invalid_request(&self) -> bool {
        self.classification() == Some(Classification::InvalidRequest)
    }

    /// Decoded response, available for rejections only
    pub fn response(&self) -> Option<&VerificationResponse> {
        match self {
            Self::Rejected { response, .. } => Some(&**response),
            _ => None,
        }
    }

    /// Raw error codes reported by the remote
    pub fn error_codes(&self) -> &[ErrorCode] {
        self.response().map(|r| r.error_codes.as_slice()).unwrap_or(&[])
    }
}

fn join_codes(codes: &[ErrorCode]) -> String {
    codes.iter().map(ErrorCode::as_str).collect::<Vec<_>>().join(", ")
}
