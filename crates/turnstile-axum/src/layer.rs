//! Tower layer that puts the gate in front of a service.

use axum::{
    extract::Request,
    response::{IntoResponse, Response},
};
use futures::future::BoxFuture;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service};
use turnstile::VerificationRequest;

use crate::config::{Gate, TurnstileConfig};
use crate::error::{ExtractionError, verification_failed};

/// Verifies the Turnstile token before the wrapped service runs.
///
/// ```ignore
/// let app = Router::new()
///     .route("/", get(handler))
///     .layer(TurnstileLayer::new(secret));
/// ```
#[derive(Clone)]
pub struct TurnstileLayer {
    gate: Arc<Gate>,
}

impl TurnstileLayer {
    /// Gate with every default, verifying against Cloudflare
    pub fn new(secret: impl Into<String>) -> Self {
        Self::with_config(secret, TurnstileConfig::default())
    }

    pub fn with_config(secret: impl Into<String>, config: TurnstileConfig) -> Self {
        Self {
            gate: Arc::new(config.resolve(secret.into())),
        }
    }
}

impl<S> Layer<S> for TurnstileLayer {
    type Service = TurnstileService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        TurnstileService {
            inner,
            gate: self.gate.clone(),
        }
    }
}

#[derive(Clone)]
pub struct TurnstileService<S> {
    inner: S,
    gate: Arc<Gate>,
}

impl Gate {
    /// Run the three extractors in order, stopping at the first failure
    fn extract(&self, request: &Request) -> Result<VerificationRequest, ExtractionError> {
        let response = self.token.extract(request)?;
        let remote_ip = self.remote_ip.extract(request)?;
        let idempotency_key = self.idempotency_key.extract(request)?;

        Ok(VerificationRequest {
            response,
            remote_ip,
            idempotency_key,
        })
    }
}

impl<S> Service<Request> for TurnstileService<S>
where
    S: Service<Request, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Response, S::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: Request) -> Self::Future {
        // Take the service that was driven to readiness
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        if (self.gate.skipper)(&request) {
            tracing::debug!(path = %request.uri().path(), "Turnstile check skipped");
            return Box::pin(inner.call(request));
        }

        let verification = match self.gate.extract(&request) {
            Ok(verification) => verification,
            Err(err) => {
                tracing::debug!(
                    path = %request.uri().path(),
                    error = %err,
                    "Turnstile input missing"
                );
                return Box::pin(async move { Ok(err.into_response()) });
            }
        };

        let gate = self.gate.clone();
        Box::pin(async move {
            match gate.verifier.verify(&verification).await {
                Ok(outcome) => {
                    tracing::debug!(
                        idempotency_key = %verification.idempotency_key,
                        hostname = %outcome.hostname,
                        "Turnstile token accepted"
                    );
                    request.extensions_mut().insert(outcome);
                    inner.call(request).await
                }
                Err(err) if err.is_validation_failed() => {
                    tracing::warn!(
                        idempotency_key = %verification.idempotency_key,
                        remote_ip = %verification.remote_ip,
                        codes = ?err.error_codes(),
                        "Turnstile token rejected"
                    );
                    Ok(verification_failed())
                }
                Err(err) => Ok((gate.error_handler)(err)),
            }
        })
    }
}
