//! Prometheus metrics for the API server.

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::time::Instant;

/// Initialize the Prometheus metrics recorder.
/// Returns a handle that can be used to render metrics.
pub fn init_metrics() -> PrometheusHandle {
    PrometheusBuilder::new().install_recorder().expect("Failed to install Prometheus recorder")
}

/// Metric names as constants for consistency.
pub mod names {
    pub const HTTP_REQUESTS_TOTAL: &str = "vclip_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "vclip_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "vclip_http_requests_in_flight";

    pub const RATE_LIMIT_HITS_TOTAL: &str = "vclip_rate_limit_hits_total";

    pub const EXTRACTION_ATTEMPTS_TOTAL: &str = "vclip_extraction_attempts_total";
    pub const CIRCUIT_STATE_TRANSITIONS_TOTAL: &str = "vclip_circuit_state_transitions_total";
    pub const CACHE_HITS_TOTAL: &str = "vclip_cache_hits_total";
    pub const CACHE_MISSES_TOTAL: &str = "vclip_cache_misses_total";
    pub const DISCOVERY_REQUEST_DURATION_SECONDS: &str = "vclip_discovery_request_duration_seconds";
    pub const CHAT_QUOTA_REJECTIONS_TOTAL: &str = "vclip_chat_quota_rejections_total";
    pub const ENRICHMENT_DECISIONS_TOTAL: &str = "vclip_enrichment_decisions_total";
}

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [("method", method.to_string()), ("path", sanitize_path(path)), ("status", status.to_string())];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record rate limit hit.
pub fn record_rate_limit_hit(endpoint: &str) {
    let labels = [("endpoint", endpoint.to_string())];
    counter!(names::RATE_LIMIT_HITS_TOTAL, &labels).increment(1);
}

/// Record a transcript extraction attempt outcome for one method.
pub fn record_extraction_attempt(method: &str, outcome: &str) {
    let labels = [("method", method.to_string()), ("outcome", outcome.to_string())];
    counter!(names::EXTRACTION_ATTEMPTS_TOTAL, &labels).increment(1);
}

/// Record a circuit breaker state transition.
pub fn record_circuit_transition(method: &str, to_state: &str) {
    let labels = [("method", method.to_string()), ("to_state", to_state.to_string())];
    counter!(names::CIRCUIT_STATE_TRANSITIONS_TOTAL, &labels).increment(1);
}

/// Record a cache lookup outcome.
pub fn record_cache_lookup(hit: bool) {
    if hit {
        counter!(names::CACHE_HITS_TOTAL).increment(1);
    } else {
        counter!(names::CACHE_MISSES_TOTAL).increment(1);
    }
}

/// Record discovery request latency.
pub fn record_discovery_duration(duration_secs: f64) {
    histogram!(names::DISCOVERY_REQUEST_DURATION_SECONDS).record(duration_secs);
}

/// Record a chat quota rejection.
pub fn record_chat_quota_rejection(reason: &str) {
    let labels = [("reason", reason.to_string())];
    counter!(names::CHAT_QUOTA_REJECTIONS_TOTAL, &labels).increment(1);
}

/// Record an enrichment controller decision.
pub fn record_enrichment_decision(decision: &str) {
    let labels = [("decision", decision.to_string())];
    counter!(names::ENRICHMENT_DECISIONS_TOTAL, &labels).increment(1);
}

/// Sanitize path for metrics labels (remove per-request identifiers).
fn sanitize_path(path: &str) -> String {
    let path = regex_lite::Regex::new(r"[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}")
        .unwrap()
        .replace_all(path, ":id");
    path.to_string()
}

/// Metrics middleware for HTTP requests.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);

    let response = next.run(request).await;

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    let status = response.status().as_u16();
    let duration = start.elapsed().as_secs_f64();

    record_http_request(&method, &path, status, duration);

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_path() {
        assert_eq!(sanitize_path("/chat/550e8400-e29b-41d4-a716-446655440000/history"), "/chat/:id/history");
    }
}
