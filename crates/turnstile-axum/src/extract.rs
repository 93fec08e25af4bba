//! Extractors for the three values a verification needs.
//!
//! Each extractor reads one value from the inbound request and either
//! returns it or fails with an [`ExtractionError`]. They hold no state
//! beyond their configuration; any closure with the right signature works
//! too.

use axum::extract::{ConnectInfo, Request};
use axum::http::header::ToStrError;
use rand::{Rng, distr::Alphanumeric};
use std::net::SocketAddr;
use std::sync::Arc;

use crate::error::ExtractionError;
use turnstile::constants::{REQUEST_ID_LENGTH, headers};

/// Reads one string value from a request.
pub trait Extractor: Send + Sync {
    fn extract(&self, request: &Request) -> Result<String, ExtractionError>;
}

impl<F> Extractor for F
where
    F: Fn(&Request) -> Result<String, ExtractionError> + Send + Sync,
{
    fn extract(&self, request: &Request) -> Result<String, ExtractionError> {
        self(request)
    }
}

/// Produces fresh request identifiers
pub type IdGenerator = Arc<dyn Fn() -> String + Send + Sync>;

/// Non-empty header value. `Err` when the header is present but not
/// visible ASCII.
fn header_value<'a>(request: &'a Request, name: &str) -> Result<Option<&'a str>, ToStrError> {
    match request.headers().get(name) {
        Some(value) => Ok(Some(value.to_str()?.trim()).filter(|v| !v.is_empty())),
        None => Ok(None),
    }
}

/// Header value for extractors that cannot fall back to anything else
fn required_header(request: &Request, name: &str, what: &str) -> Result<String, ExtractionError> {
    match header_value(request, name) {
        Ok(Some(value)) => Ok(value.to_string()),
        Ok(None) => Err(ExtractionError::bad_request(format!(
            "expected {what} in header {name}"
        ))),
        Err(_) => Err(ExtractionError::bad_request(format!(
            "malformed {what} in header {name}"
        ))),
    }
}

/// Token from a request header (`cf-turnstile-response` by default)
#[derive(Debug, Clone)]
pub struct HeaderTokenExtractor {
    header_name: String,
}

impl HeaderTokenExtractor {
    pub fn new(header_name: impl Into<String>) -> Self {
        Self {
            header_name: header_name.into(),
        }
    }
}

impl Default for HeaderTokenExtractor {
    fn default() -> Self {
        Self::new(headers::TURNSTILE_RESPONSE)
    }
}

impl Extractor for HeaderTokenExtractor {
    fn extract(&self, request: &Request) -> Result<String, ExtractionError> {
        required_header(request, &self.header_name, "turnstile response")
    }
}

/// Best-effort client IP.
///
/// Tries the first `X-Forwarded-For` entry, then `X-Real-IP`, then the peer
/// address recorded by `into_make_service_with_connect_info`. Never fails; an
/// unknown address is sent as an empty string, which siteverify accepts.
#[derive(Debug, Clone, Copy, Default)]
pub struct RealIpExtractor;

impl Extractor for RealIpExtractor {
    fn extract(&self, request: &Request) -> Result<String, ExtractionError> {
        // Unreadable hints are skipped, not fatal
        if let Ok(Some(forwarded)) = header_value(request, headers::X_FORWARDED_FOR) {
            if let Some(first) = forwarded.split(',').map(str::trim).find(|v| !v.is_empty()) {
                return Ok(first.to_string());
            }
        }

        if let Ok(Some(real_ip)) = header_value(request, headers::X_REAL_IP) {
            return Ok(real_ip.to_string());
        }

        Ok(request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string())
            .unwrap_or_default())
    }
}

/// Client IP from a header set by a trusted proxy (`CF-Connecting-IP` by
/// default). Fails when the header is missing.
#[derive(Debug, Clone)]
pub struct HeaderIpExtractor {
    header_name: String,
}

impl HeaderIpExtractor {
    pub fn new(header_name: impl Into<String>) -> Self {
        Self {
            header_name: header_name.into(),
        }
    }

    /// Cloudflare's `CF-Connecting-IP`
    pub fn cloudflare() -> Self {
        Self::new(headers::CF_CONNECTING_IP)
    }
}

impl Extractor for HeaderIpExtractor {
    fn extract(&self, request: &Request) -> Result<String, ExtractionError> {
        required_header(request, &self.header_name, "remote ip")
    }
}

/// Idempotency key: the inbound `x-request-id`, or a generated one
#[derive(Clone)]
pub struct RequestIdExtractor {
    generator: IdGenerator,
}

impl RequestIdExtractor {
    pub fn new(generator: IdGenerator) -> Self {
        Self { generator }
    }
}

impl Default for RequestIdExtractor {
    fn default() -> Self {
        Self::new(Arc::new(generate_request_id))
    }
}

impl Extractor for RequestIdExtractor {
    fn extract(&self, request: &Request) -> Result<String, ExtractionError> {
        Ok(header_value(request, headers::X_REQUEST_ID)
            .ok()
            .flatten()
            .map(str::to_string)
            .unwrap_or_else(|| (self.generator)()))
    }
}

/// Random alphanumeric request identifier
pub fn generate_request_id() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(REQUEST_ID_LENGTH)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{HeaderValue, StatusCode};
    use tokio_test::{assert_err, assert_ok};

    fn request(headers: &[(&str, &str)]) -> Request {
        let mut builder = axum::http::Request::builder().uri("/");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn test_token_from_default_header() {
        let req = request(&[("cf-turnstile-response", "tok-1")]);
        assert_eq!(assert_ok!(HeaderTokenExtractor::default().extract(&req)), "tok-1");
    }

    #[test]
    fn test_missing_token_names_header() {
        let err = assert_err!(HeaderTokenExtractor::new("x-captcha").extract(&request(&[])));
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.message, "expected turnstile response in header x-captcha");

        // Empty counts as missing
        let err = assert_err!(
            HeaderTokenExtractor::default().extract(&request(&[("cf-turnstile-response", "")]))
        );
        assert!(err.message.contains("cf-turnstile-response"));
    }

    #[test]
    fn test_real_ip_precedence() {
        let req = request(&[
            ("x-forwarded-for", "198.51.100.1, 10.0.0.1"),
            ("x-real-ip", "198.51.100.2"),
        ]);
        assert_eq!(assert_ok!(RealIpExtractor.extract(&req)), "198.51.100.1");

        let req = request(&[("x-real-ip", "198.51.100.2")]);
        assert_eq!(assert_ok!(RealIpExtractor.extract(&req)), "198.51.100.2");

        let mut req = request(&[]);
        req.extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([192, 0, 2, 9], 40000))));
        assert_eq!(assert_ok!(RealIpExtractor.extract(&req)), "192.0.2.9");

        assert_eq!(assert_ok!(RealIpExtractor.extract(&request(&[]))), "");
    }

    #[test]
    fn test_cloudflare_ip_header() {
        let req = request(&[("CF-Connecting-IP", "203.0.113.50")]);
        assert_eq!(assert_ok!(HeaderIpExtractor::cloudflare().extract(&req)), "203.0.113.50");

        let err = assert_err!(HeaderIpExtractor::cloudflare().extract(&request(&[])));
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.message, "expected remote ip in header CF-Connecting-IP");
    }

    #[test]
    fn test_request_id_reused_or_generated() {
        let extractor = RequestIdExtractor::new(Arc::new(|| "generated".to_string()));
        let req = request(&[("x-request-id", "abc-123")]);
        assert_eq!(assert_ok!(extractor.extract(&req)), "abc-123");
        assert_eq!(assert_ok!(extractor.extract(&request(&[]))), "generated");
    }

    #[test]
    fn test_generate_request_id() {
        let id = generate_request_id();
        assert_eq!(id.len(), REQUEST_ID_LENGTH);
        assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(id, generate_request_id());
    }

    #[test]
    fn test_closure_extractor() {
        let fixed = |_: &Request| -> Result<String, ExtractionError> { Ok("fixed".to_string()) };
        assert_eq!(assert_ok!(fixed.extract(&request(&[]))), "fixed");
    }

    #[test]
    fn test_non_ascii_header_is_malformed_not_missing() {
        let mut req = request(&[]);
        req.headers_mut().insert(
            "cf-turnstile-response",
            HeaderValue::from_bytes(b"tok\xe9").unwrap(),
        );
        let err = assert_err!(HeaderTokenExtractor::default().extract(&req));
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.message, "malformed turnstile response in header cf-turnstile-response");

        req.headers_mut()
            .insert("cf-connecting-ip", HeaderValue::from_bytes(b"10.0.0.\xff").unwrap());
        let err = assert_err!(HeaderIpExtractor::cloudflare().extract(&req));
        assert_eq!(err.message, "malformed remote ip in header CF-Connecting-IP");
    }

    #[test]
    fn test_non_ascii_hints_fall_through() {
        let mut req = request(&[("x-real-ip", "198.51.100.2")]);
        req.headers_mut()
            .insert("x-forwarded-for", HeaderValue::from_bytes(b"\xe9").unwrap());
        req.headers_mut()
            .insert("x-request-id", HeaderValue::from_bytes(b"id-\xe9").unwrap());
        assert_eq!(assert_ok!(RealIpExtractor.extract(&req)), "198.51.100.2");

        let extractor = RequestIdExtractor::new(Arc::new(|| "generated".to_string()));
        assert_eq!(assert_ok!(extractor.extract(&req)), "generated");
    }
}
