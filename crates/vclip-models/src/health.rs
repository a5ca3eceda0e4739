//! Per-method and per-instance resilience state snapshots.
//!
//! These types are the serializable shapes exchanged with
//! `vclip_core::health_monitor::HealthMonitor::export_stats`/`import_stats`;
//! the live registries wrap them in locks, see `vclip-core`.

use std::collections::HashMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Coarse classification of an extraction failure, used both for alerting
/// and for `get_method_priority` scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    Timeout,
    RateLimit,
    Blocked,
    NotFound,
    NoTranscript,
    Network,
    Other,
}

impl ErrorClass {
    /// Classify an error message by substring match, in the priority
    /// order used throughout the health monitor.
    pub fn classify(message: &str) -> Self {
        let lower = message.to_lowercase();
        if lower.contains("timeout") {
            ErrorClass::Timeout
        } else if lower.contains("429") || lower.contains("rate") {
            ErrorClass::RateLimit
        } else if lower.contains("403") || lower.contains("blocked") {
            ErrorClass::Blocked
        } else if lower.contains("404") || lower.contains("not found") {
            ErrorClass::NotFound
        } else if lower.contains("no transcript") || lower.contains("disabled") {
            ErrorClass::NoTranscript
        } else if lower.contains("network") || lower.contains("connection") {
            ErrorClass::Network
        } else {
            ErrorClass::Other
        }
    }
}

/// Rolling statistics for one extraction method.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct MethodStats {
    pub success: u64,
    pub failure: u64,
    pub total_time_ms: u64,
    pub last_success_at: Option<chrono::DateTime<chrono::Utc>>,
    pub last_failure_at: Option<chrono::DateTime<chrono::Utc>>,
    pub error_types: HashMap<ErrorClass, u64>,
}

impl MethodStats {
    pub fn attempts(&self) -> u64 {
        self.success + self.failure
    }

    pub fn success_rate(&self) -> f64 {
        let attempts = self.attempts();
        if attempts == 0 {
            return 1.0;
        }
        self.success as f64 / attempts as f64
    }

    pub fn avg_time_ms(&self) -> f64 {
        let attempts = self.attempts();
        if attempts == 0 {
            return 0.0;
        }
        self.total_time_ms as f64 / attempts as f64
    }
}

/// Full exportable stats snapshot, round-tripped through `serde_json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct MethodStatsSnapshot {
    pub methods: HashMap<String, MethodStats>,
}

/// Per-method circuit state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

/// Per-instance-URL health for interchangeable mirror pools (Invidious/Piped).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct InstanceHealth {
    pub url: String,
    pub failures: u32,
    pub successes: u32,
    pub last_check_at: Option<chrono::DateTime<chrono::Utc>>,
    pub is_healthy: bool,
}
