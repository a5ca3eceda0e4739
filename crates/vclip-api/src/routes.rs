//! API routes.

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;

use crate::handlers::chat::{ask, history, quota};
use crate::handlers::discovery::discover;
use crate::handlers::health::{health, ready};
use crate::handlers::transcripts::extract;
use crate::metrics::metrics_middleware;
use crate::middleware::{cors_layer, rate_limit_middleware, request_id, request_logging, security_headers, RateLimiterCache};
use crate::state::AppState;

/// Create the API router.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let transcript_routes = Router::new().route("/transcripts/extract", post(extract));

    let discovery_routes = Router::new().route("/discovery", post(discover));

    let chat_routes = Router::new()
        .route("/chat/:summary_id", post(ask))
        .route("/chat/:summary_id/history", get(history))
        .route("/chat/:summary_id/quota", get(quota));

    let rate_limiter = std::sync::Arc::new(RateLimiterCache::new(state.config.rate_limit_rps));

    let gated_routes = Router::new()
        .merge(transcript_routes)
        .merge(discovery_routes)
        .merge(chat_routes)
        .layer(middleware::from_fn_with_state(rate_limiter, rate_limit_middleware));

    let health_routes =
        Router::new().route("/health", get(health)).route("/healthz", get(health)).route("/ready", get(ready));

    let metrics_routes = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    Router::new()
        .merge(gated_routes)
        .merge(health_routes)
        .merge(metrics_routes)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(security_headers))
        .layer(middleware::from_fn(request_id))
        .layer(middleware::from_fn(request_logging))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}
