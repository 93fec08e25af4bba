//! Gate configuration.
//!
//! Every field is an optional override. Absent fields fall back to their
//! default independently of one another, and defaults are resolved once when
//! the layer is built.

use axum::{
    extract::Request,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use turnstile::{Verifier, VerifierClient, VerifyError, constants::DEFAULT_VERIFY_URL};

use crate::extract::{
    Extractor, HeaderTokenExtractor, IdGenerator, RealIpExtractor, RequestIdExtractor,
};

/// Returns true for requests that bypass verification
pub type Skipper = Arc<dyn Fn(&Request) -> bool + Send + Sync>;

/// Turns a propagated verifier error into a response
pub type ErrorHandler = Arc<dyn Fn(VerifyError) -> Response + Send + Sync>;

/// Optional overrides for [`TurnstileLayer`](crate::TurnstileLayer)
#[derive(Clone, Default)]
pub struct TurnstileConfig {
    /// Bypass predicate (default: never skip)
    pub skipper: Option<Skipper>,

    /// Verifier (default: [`VerifierClient`] built from the secret)
    pub verifier: Option<Arc<dyn Verifier>>,

    /// Siteverify URL for the default verifier. Ignored when `verifier` is set.
    pub verify_url: Option<String>,

    /// Token extractor (default: `cf-turnstile-response` header)
    pub token_extractor: Option<Arc<dyn Extractor>>,

    /// Remote IP extractor (default: [`RealIpExtractor`])
    pub remote_ip_extractor: Option<Arc<dyn Extractor>>,

    /// Idempotency key extractor (default: [`RequestIdExtractor`])
    pub idempotency_key_extractor: Option<Arc<dyn Extractor>>,

    /// Generator used by the default idempotency key extractor
    pub request_id_generator: Option<IdGenerator>,

    /// Handler for verifier errors other than a failed validation
    /// (default: [`default_error_handler`])
    pub error_handler: Option<ErrorHandler>,
}

impl TurnstileConfig {
    pub fn with_skipper<F>(mut self, skipper: F) -> Self
    where
        F: Fn(&Request) -> bool + Send + Sync + 'static,
    {
        self.skipper = Some(Arc::new(skipper));
        self
    }

    pub fn with_verifier<V: Verifier + 'static>(mut self, verifier: V) -> Self {
        self.verifier = Some(Arc::new(verifier));
        self
    }

    pub fn with_verify_url(mut self, url: impl Into<String>) -> Self {
        self.verify_url = Some(url.into());
        self
    }

    pub fn with_token_extractor<E: Extractor + 'static>(mut self, extractor: E) -> Self {
        self.token_extractor = Some(Arc::new(extractor));
        self
    }

    pub fn with_remote_ip_extractor<E: Extractor + 'static>(mut self, extractor: E) -> Self {
        self.remote_ip_extractor = Some(Arc::new(extractor));
        self
    }

    pub fn with_idempotency_key_extractor<E: Extractor + 'static>(mut self, extractor: E) -> Self {
        self.idempotency_key_extractor = Some(Arc::new(extractor));
        self
    }

    pub fn with_request_id_generator<F>(mut self, generator: F) -> Self
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        self.request_id_generator = Some(Arc::new(generator));
        self
    }

    pub fn with_error_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(VerifyError) -> Response + Send + Sync + 'static,
    {
        self.error_handler = Some(Arc::new(handler));
        self
    }

    /// Fill every absent field with its default
    pub(crate) fn resolve(self, secret: String) -> Gate {
        let verifier = self.verifier.unwrap_or_else(|| {
            let url = self
                .verify_url
                .unwrap_or_else(|| DEFAULT_VERIFY_URL.to_string());
            Arc::new(VerifierClient::with_url(secret, url))
        });

        let idempotency_key = self.idempotency_key_extractor.unwrap_or_else(|| {
            let extractor = match self.request_id_generator {
                Some(generator) => RequestIdExtractor::new(generator),
                None => RequestIdExtractor::default(),
            };
            Arc::new(extractor)
        });

        Gate {
            skipper: self.skipper.unwrap_or_else(|| Arc::new(|_: &Request| false)),
            verifier,
            token: self
                .token_extractor
                .unwrap_or_else(|| Arc::new(HeaderTokenExtractor::default())),
            remote_ip: self
                .remote_ip_extractor
                .unwrap_or_else(|| Arc::new(RealIpExtractor)),
            idempotency_key,
            error_handler: self
                .error_handler
                .unwrap_or_else(|| Arc::new(default_error_handler)),
        }
    }
}

/// Fully resolved configuration shared by every request
pub(crate) struct Gate {
    pub skipper: Skipper,
    pub verifier: Arc<dyn Verifier>,
    pub token: Arc<dyn Extractor>,
    pub remote_ip: Arc<dyn Extractor>,
    pub idempotency_key: Arc<dyn Extractor>,
    pub error_handler: ErrorHandler,
}

/// Logs the error and answers 500.
///
/// The error is attached to the response extensions as `Arc<VerifyError>` so
/// outer layers can inspect it.
pub fn default_error_handler(err: VerifyError) -> Response {
    tracing::error!(
        error = %err,
        classification = ?err.classification(),
        "Turnstile verification error"
    );

    let mut response = (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response();
    response.extensions_mut().insert(Arc::new(err));
    response
}
