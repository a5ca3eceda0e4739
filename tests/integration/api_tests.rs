//! API integration tests.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

/// Test health endpoint.
#[tokio::test]
async fn test_health_endpoint() {
    dotenvy::dotenv().ok();

    let app = create_test_router().await;

    let response = app.oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap()).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

/// Test metrics endpoint (when enabled).
#[tokio::test]
async fn test_metrics_endpoint() {
    dotenvy::dotenv().ok();

    let app = create_test_router().await;

    let response = app.oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap()).await.unwrap();

    assert!(response.status() == StatusCode::OK || response.status() == StatusCode::NOT_FOUND);
}

/// Test CORS headers.
#[tokio::test]
async fn test_cors_headers() {
    dotenvy::dotenv().ok();

    let app = create_test_router().await;

    let response = app
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/discovery")
                .header("Origin", "http://localhost:3000")
                .header("Access-Control-Request-Method", "POST")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert!(response.status() == StatusCode::OK || response.status() == StatusCode::NO_CONTENT);
}

/// Test security headers.
#[tokio::test]
async fn test_security_headers() {
    dotenvy::dotenv().ok();

    let app = create_test_router().await;

    let response = app.oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap()).await.unwrap();

    let headers = response.headers();

    assert!(headers.contains_key("X-Content-Type-Options"));
    assert!(headers.contains_key("X-Frame-Options"));
    assert!(headers.contains_key("X-Request-ID"));
}

/// Test that protected endpoints reject unauthenticated requests.
#[tokio::test]
async fn test_chat_requires_authorization() {
    dotenvy::dotenv().ok();

    let app = create_test_router().await;

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/chat/00000000-0000-0000-0000-000000000000")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"question":"hi","use_web_search":false}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

/// Helper to create a test router against the real (env-configured) state,
/// falling back to a minimal health-only router when dependencies such as
/// `FIREBASE_PROJECT_ID` aren't configured in the test environment.
async fn create_test_router() -> axum::Router {
    use vclip_api::{create_router, metrics, ApiConfig, AppState};
    use vclip_core::CoreConfig;

    let config = ApiConfig::from_env();
    let core_config = CoreConfig::from_env();

    match AppState::new(config, core_config).await {
        Ok(state) => {
            let metrics_handle = Some(metrics::init_metrics());
            create_router(state, metrics_handle)
        }
        Err(_) => {
            use axum::routing::get;
            use axum::Json;
            use serde_json::json;

            axum::Router::new()
                .route(
                    "/health",
                    get(|| async { Json(json!({ "status": "healthy", "version": env!("CARGO_PKG_VERSION") })) }),
                )
                .route("/metrics", get(|| async { "# No metrics" }))
        }
    }
}
