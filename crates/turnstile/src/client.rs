//! Siteverify client.
//!
//! One POST per call, no retries and no timeout of its own. Dropping the
//! future returned by [`Verifier::verify`] aborts the in-flight request, so
//! callers bound the call with whatever deadline they already have.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

use crate::constants::DEFAULT_VERIFY_URL;
use crate::error::VerifyError;
use crate::types::{VerificationRequest, VerificationResponse};

/// Anything that can check a token.
///
/// On `success: false` the implementation returns [`VerifyError::Rejected`]
/// carrying the decoded response.
#[async_trait]
pub trait Verifier: Send + Sync {
    async fn verify(
        &self,
        request: &VerificationRequest,
    ) -> Result<VerificationResponse, VerifyError>;
}

#[async_trait]
impl<V: Verifier + ?Sized> Verifier for Arc<V> {
    async fn verify(
        &self,
        request: &VerificationRequest,
    ) -> Result<VerificationResponse, VerifyError> {
        (**self).verify(request).await
    }
}

/// HTTP verifier talking to Cloudflare (or any compatible endpoint)
#[derive(Clone)]
pub struct VerifierClient {
    secret: String,
    url: String,
    http: reqwest::Client,
}

/// Request body: the caller's fields plus the secret
#[derive(Serialize)]
struct SecretRequest<'a> {
    #[serde(flatten)]
    request: &'a VerificationRequest,
    secret: &'a str,
}

impl VerifierClient {
    /// Client for the public Cloudflare endpoint
    pub fn new(secret: impl Into<String>) -> Self {
        Self::with_url(secret, DEFAULT_VERIFY_URL)
    }

    /// Client for a custom endpoint (tests, proxies)
    pub fn with_url(secret: impl Into<String>, url: impl Into<String>) -> Self {
        Self::with_http_client(secret, url, reqwest::Client::new())
    }

    /// Reuse an existing connection pool
    pub fn with_http_client(
        secret: impl Into<String>,
        url: impl Into<String>,
        http: reqwest::Client,
    ) -> Self {
        Self {
            secret: secret.into(),
            url: url.into(),
            http,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl fmt::Debug for VerifierClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerifierClient")
            .field("url", &self.url)
            .field("secret", &"<redacted>")
            .finish()
    }
}

#[async_trait]
impl Verifier for VerifierClient {
    async fn verify(
        &self,
        request: &VerificationRequest,
    ) -> Result<VerificationResponse, VerifyError> {
        let body = serde_json::to_vec(&SecretRequest {
            request,
            secret: &self.secret,
        })
        .map_err(VerifyError::Serialize)?;

        let http_resp = self
            .http
            .post(&self.url)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(VerifyError::Transport)?;

        let status = http_resp.status();
        let bytes = http_resp.bytes().await.map_err(VerifyError::Transport)?;

        let response: VerificationResponse =
            serde_json::from_slice(&bytes).map_err(VerifyError::Decode)?;

        if !response.success {
            tracing::debug!(
                status = %status,
                codes = ?response.error_codes,
                "Siteverify rejected token"
            );
            return Err(VerifyError::rejected(response));
        }

        tracing::debug!(
            hostname = %response.hostname,
            action = %response.action,
            "Siteverify accepted token"
        );

        Ok(response)
    }
}
