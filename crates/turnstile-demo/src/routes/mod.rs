//! HTTP routes for the demo server.

use axum::{Router, extract::Request, http::StatusCode, routing::get};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use turnstile_axum::{HeaderIpExtractor, HeaderTokenExtractor, TurnstileConfig, TurnstileLayer};

use crate::config::AppConfig;

mod health;

/// Create the main application router
pub fn create_router(config: &AppConfig) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health::health_check))
        .layer(turnstile_layer(config))
        // Dropping the request future on timeout also aborts the siteverify call
        .layer(TimeoutLayer::new(Duration::from_secs(config.request_timeout_secs)))
        .layer(TraceLayer::new_for_http())
}

/// Build the gate from the loaded configuration
fn turnstile_layer(config: &AppConfig) -> TurnstileLayer {
    let skip_paths: Arc<[String]> = config.skip_paths.clone().into();

    let mut gate = TurnstileConfig::default()
        .with_verify_url(config.verify_url.clone())
        .with_token_extractor(HeaderTokenExtractor::new(config.token_header.clone()))
        .with_skipper(move |request: &Request| {
            skip_paths.iter().any(|path| path == request.uri().path())
        });

    if let Some(ref header) = config.trusted_ip_header {
        gate = gate.with_remote_ip_extractor(HeaderIpExtractor::new(header.clone()));
    }

    TurnstileLayer::with_config(config.secret.clone(), gate)
}

async fn index() -> StatusCode {
    StatusCode::NO_CONTENT
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Json, body::Body, body::to_bytes, routing::post};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    async fn siteverify_stub(reply: Value) -> String {
        let app = Router::new().route(
            "/siteverify",
            post(move || {
                let reply = reply.clone();
                async move { Json(reply) }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/siteverify")
    }

    fn config(verify_url: String) -> AppConfig {
        AppConfig {
            secret: "1x0000000000000000000000000000000AA".to_string(),
            verify_url,
            ..AppConfig::default()
        }
    }

    fn get_request(uri: &str, token: Option<&str>) -> Request {
        let mut builder = axum::http::Request::builder().uri(uri);
        if let Some(token) = token {
            builder = builder.header("cf-turnstile-response", token);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_index_with_valid_token() {
        let url = siteverify_stub(json!({"success": true, "hostname": "localhost"})).await;
        let app = create_router(&config(url));

        let response = app.oneshot(get_request("/", Some("tok"))).await.unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_index_without_token() {
        let url = siteverify_stub(json!({"success": true})).await;
        let app = create_router(&config(url));

        let response = app.oneshot(get_request("/", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"expected turnstile response in header cf-turnstile-response");
    }

    #[tokio::test]
    async fn test_health_is_skipped() {
        let url = siteverify_stub(json!({"success": false, "error-codes": ["internal-error"]})).await;
        let app = create_router(&config(url));

        let response = app.oneshot(get_request("/health", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let health: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(health["status"], "ok");
    }

    #[tokio::test]
    async fn test_trusted_ip_header_required_when_configured() {
        let url = siteverify_stub(json!({"success": true})).await;
        let app = create_router(&AppConfig {
            trusted_ip_header: Some("CF-Connecting-IP".to_string()),
            ..config(url)
        });

        let response = app.oneshot(get_request("/", Some("tok"))).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
