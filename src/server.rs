//! HTTP API over [`crate::verify_document_response`].
//!
//! | Route                     | Response |
//! |---------------------------|----------|
//! | `GET /`                   | service name, version, routes |
//! | `GET /test`               | `{"message": "This is a test endpoint"}` |
//! | `GET /analyze-pdf?url=…`  | [`crate::VerificationReport`] or `{"error": …}` |
//!
//! Document-level failures (download, corrupt PDF, classifier down) are
//! answered with status 200 and an `error` body so that batch callers can
//! treat every document uniformly. A missing or non-HTTP `url` gets a 400;
//! only a panic inside a handler gets a 500, with a generic message.

use crate::analyze::verify_document_response;
use crate::config::VerificationConfig;
use crate::error::VerifyError;
use crate::output::DocumentResponse;
use crate::pipeline::input::is_url;
use axum::{
    extract::{Query, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::Deserialize;
use std::any::Any;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{Any as AnyOrigin, CorsLayer},
    trace::TraceLayer,
};

#[derive(Debug, Deserialize)]
struct AnalyzeParams {
    url: Option<String>,
}

async fn index_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "routes": ["/test", "/analyze-pdf?url=<document url>"],
    }))
}

async fn test_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "message": "This is a test endpoint" }))
}

async fn analyze_handler(
    State(config): State<Arc<VerificationConfig>>,
    Query(params): Query<AnalyzeParams>,
) -> Response {
    let Some(url) = params.url.filter(|u| !u.trim().is_empty()) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(DocumentResponse::Error {
                error: "missing 'url' query parameter".to_string(),
            }),
        )
            .into_response();
    };

    // Local paths would let callers read the server's filesystem.
    if !is_url(&url) {
        return (
            StatusCode::BAD_REQUEST,
            Json(DocumentResponse::Error {
                error: format!("'{url}' is not an HTTP/HTTPS URL"),
            }),
        )
            .into_response();
    }

    tracing::debug!(target: "domverify-http", "analyze_handler: url={}", url);
    Json(verify_document_response(&url, &config).await).into_response()
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .cloned()
        .or_else(|| err.downcast_ref::<&str>().map(|s| s.to_string()))
        .unwrap_or_else(|| "unknown panic".to_string());
    tracing::error!(target: "domverify-http", "handler panicked: {}", detail);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(DocumentResponse::Error {
            error: "An unexpected error occurred".to_string(),
        }),
    )
        .into_response()
}

/// Build the application router.
pub fn router(config: Arc<VerificationConfig>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AnyOrigin)
        .allow_methods([Method::GET])
        .allow_headers(AnyOrigin);

    Router::new()
        .route("/", get(index_handler))
        .route("/test", get(test_handler))
        .route("/analyze-pdf", get(analyze_handler))
        .with_state(config)
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Serve the API on `listen_addr` until Ctrl-C.
pub async fn run_server(listen_addr: &str, config: VerificationConfig) -> Result<(), VerifyError> {
    let addr: SocketAddr = listen_addr
        .parse()
        .map_err(|e| VerifyError::InvalidConfig(format!("listen address '{listen_addr}': {e}")))?;
    let app = router(Arc::new(config));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| VerifyError::Internal(format!("bind {addr}: {e}")))?;
    tracing::info!(target: "domverify-http", "listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!(target: "domverify-http", "shutting down gracefully");
        })
        .await
        .map_err(|e| VerifyError::Internal(format!("server error: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    fn app() -> Router {
        router(Arc::new(VerificationConfig::default()))
    }

    async fn get_json(uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_endpoint_answers() {
        let (status, body) = get_json("/test").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "This is a test endpoint");
    }

    #[tokio::test]
    async fn index_lists_routes() {
        let (status, body) = get_json("/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["service"], "domicile-verify");
    }

    #[tokio::test]
    async fn missing_url_is_bad_request() {
        let (status, body) = get_json("/analyze-pdf").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("url"));
    }

    #[tokio::test]
    async fn local_path_is_rejected() {
        let (status, body) = get_json("/analyze-pdf?url=%2Fetc%2Fpasswd").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("HTTP"));
    }

    #[tokio::test]
    async fn unreachable_document_is_200_with_error() {
        let (status, body) = get_json("/analyze-pdf?url=http%3A%2F%2F127.0.0.1%3A9%2Fmail.pdf").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["error"].as_str().unwrap().contains("Failed to download"));
    }
}
