//! # Turnstile
//!
//! Client for Cloudflare Turnstile's siteverify endpoint.
//!
//! ## Modules
//! - `types` - Wire types (VerificationRequest, VerificationResponse, ErrorCode)
//! - `client` - The `Verifier` trait and its HTTP implementation
//! - `error` - Verification errors and their classification
//! - `constants` - Endpoint URL, header names, error-code strings

pub mod client;
pub mod constants;
pub mod error;
pub mod types;

pub use client::{Verifier, VerifierClient};
pub use error::VerifyError;
pub use types::*;
