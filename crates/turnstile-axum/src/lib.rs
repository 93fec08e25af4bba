//! # Turnstile gate for axum
//!
//! A tower [`Layer`](tower::Layer) that checks a Cloudflare Turnstile token
//! before the wrapped route runs.
//!
//! Per request: skip check → extract token, remote IP and idempotency key →
//! verify → forward. A token the remote refuses becomes a 400 with a generic
//! message; every other verifier error goes to the configured error handler.
//! On success the decoded [`VerificationResponse`](turnstile::VerificationResponse)
//! is available to handlers through request extensions.

mod config;
mod error;
mod extract;
mod layer;

pub use config::{ErrorHandler, Skipper, TurnstileConfig, default_error_handler};
pub use error::{ExtractionError, VERIFICATION_FAILED_MESSAGE};
pub use extract::{
    Extractor, HeaderIpExtractor, HeaderTokenExtractor, IdGenerator, RealIpExtractor,
    RequestIdExtractor, generate_request_id,
};
pub use layer::{TurnstileLayer, TurnstileService};
