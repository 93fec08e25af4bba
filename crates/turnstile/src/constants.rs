//! Shared constants for Turnstile components.

/// Cloudflare siteverify endpoint
pub const DEFAULT_VERIFY_URL: &str = "https://challenges.cloudflare.com/turnstile/v0/siteverify";

/// Length of generated request identifiers
pub const REQUEST_ID_LENGTH: usize = 32;

/// HTTP header names
pub mod headers {
    /// Token posted by the Turnstile widget
    pub const TURNSTILE_RESPONSE: &str = "cf-turnstile-response";

    /// Client IP as seen by Cloudflare's edge
    pub const CF_CONNECTING_IP: &str = "CF-Connecting-IP";

    /// Request identifier, reused as the idempotency key
    pub const X_REQUEST_ID: &str = "x-request-id";

    /// Proxy chain, leftmost entry is the client
    pub const X_FORWARDED_FOR: &str = "x-forwarded-for";

    /// Single client address set by a reverse proxy
    pub const X_REAL_IP: &str = "x-real-ip";
}

/// Error codes returned by siteverify
pub mod error_codes {
    pub const MISSING_INPUT_SECRET: &str = "missing-input-secret";
    pub const INVALID_INPUT_SECRET: &str = "invalid-input-secret";
    pub const MISSING_INPUT_RESPONSE: &str = "missing-input-response";
    pub const INVALID_INPUT_RESPONSE: &str = "invalid-input-response";
    pub const INVALID_WIDGET_ID: &str = "invalid-widget-id";
    pub const INVALID_PARSED_SECRET: &str = "invalid-parsed-secret";
    pub const BAD_REQUEST: &str = "bad-request";
    pub const TIMEOUT_OR_DUPLICATE: &str = "timeout-or-duplicate";
    pub const INTERNAL_ERROR: &str = "internal-error";
}
