//! Rolling per-method health statistics, alerting, and priority ordering.
//!
//! Grounded on the teacher's `JobLogger` structured-logging idiom
//! (`vclip-worker::logging`) for the alert emission, and on the original
//! Python `monitor.py`'s stats-export/import round-trip and
//! score-based method ordering (`get_method_priority`), reimplemented
//! against `vclip_models::health::MethodStats`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use tracing::warn;
use vclip_models::health::MethodStatsSnapshot;
use vclip_models::{ErrorClass, MethodStats};

const ALERT_MIN_ATTEMPTS: u64 = 10;
const ALERT_SUCCESS_FLOOR: f64 = 0.5;
const ALERT_SUPPRESSION: Duration = Duration::from_secs(3600);
const ERROR_CLASS_ALERT_RATIO: f64 = 0.3;
const ERROR_CLASS_ALERT_SUPPRESSION: Duration = Duration::from_secs(7200);
const PRIORITY_CACHE_TTL: Duration = Duration::from_secs(300);
const RECENT_FAILURE_WINDOW: Duration = Duration::from_secs(300);

struct Tracked {
    stats: MethodStats,
    last_event_at: Instant,
    alert_suppressed_until: Option<Instant>,
    error_alert_suppressed_until: Option<Instant>,
}

impl Tracked {
    fn new() -> Self {
        Self {
            stats: MethodStats::default(),
            last_event_at: Instant::now(),
            alert_suppressed_until: None,
            error_alert_suppressed_until: None,
        }
    }
}

struct CachedPriority {
    order: Vec<String>,
    computed_at: Instant,
}

pub struct HealthMonitor {
    methods: RwLock<HashMap<String, Tracked>>,
    priority_cache: RwLock<Option<CachedPriority>>,
}

impl HealthMonitor {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            methods: RwLock::new(HashMap::new()),
            priority_cache: RwLock::new(None),
        })
    }

    /// Record one extraction attempt, updating counters, classifying the
    /// error (if any), and emitting suppressed alerts on degradation.
    pub async fn record_attempt(
        &self,
        method: &str,
        success: bool,
        duration_ms: u64,
        error: Option<&str>,
    ) {
        let mut methods = self.methods.write().await;
        let tracked = methods.entry(method.to_string()).or_insert_with(Tracked::new);
        tracked.last_event_at = Instant::now();
        tracked.stats.total_time_ms += duration_ms;

        if success {
            tracked.stats.success += 1;
            tracked.stats.last_success_at = Some(chrono::Utc::now());
        } else {
            tracked.stats.failure += 1;
            tracked.stats.last_failure_at = Some(chrono::Utc::now());
            if let Some(message) = error {
                let class = ErrorClass::classify(message);
                *tracked.stats.error_types.entry(class).or_insert(0) += 1;
            }
        }

        self.maybe_alert(method, tracked);
        // Invalidate the cached priority order; it is recomputed lazily.
        drop(methods);
        *self.priority_cache.write().await = None;
    }

    fn maybe_alert(&self, method: &str, tracked: &mut Tracked) {
        let attempts = tracked.stats.attempts();
        if attempts < ALERT_MIN_ATTEMPTS {
            return;
        }

        let now = Instant::now();
        let success_rate = tracked.stats.success_rate();
        if success_rate < ALERT_SUCCESS_FLOOR {
            let suppressed = tracked
                .alert_suppressed_until
                .map(|t| now < t)
                .unwrap_or(false);
            if !suppressed {
                warn!(
                    method = method,
                    success_rate = success_rate,
                    attempts = attempts,
                    "extraction method success rate below floor"
                );
                tracked.alert_suppressed_until = Some(now + ALERT_SUPPRESSION);
            }
        }

        if let Some((class, count)) = tracked
            .stats
            .error_types
            .iter()
            .max_by_key(|(_, count)| **count)
        {
            let ratio = *count as f64 / attempts as f64;
            if ratio > ERROR_CLASS_ALERT_RATIO {
                let suppressed = tracked
                    .error_alert_suppressed_until
                    .map(|t| now < t)
                    .unwrap_or(false);
                if !suppressed {
                    warn!(
                        method = method,
                        error_class = ?class,
                        ratio = ratio,
                        "extraction method dominated by a single error class"
                    );
                    tracked.error_alert_suppressed_until = Some(now + ERROR_CLASS_ALERT_SUPPRESSION);
                }
            }
        }
    }

    /// Score `= 0.7 * success_rate + 0.3 * time_score`, with a 20% penalty
    /// for a failure in the last five minutes, and a neutral 0.5 for
    /// methods with fewer than 3 attempts.
    async fn score(&self, method: &str) -> f64 {
        let methods = self.methods.read().await;
        let Some(tracked) = methods.get(method) else {
            return 0.5;
        };
        if tracked.stats.attempts() < 3 {
            return 0.5;
        }

        let success_rate = tracked.stats.success_rate();
        let time_score = (1.0 - tracked.stats.avg_time_ms() / 10_000.0).max(0.0);
        let mut score = 0.7 * success_rate + 0.3 * time_score;

        let recent_failure = tracked
            .stats
            .last_failure_at
            .map(|t| {
                chrono::Utc::now().signed_duration_since(t).num_seconds()
                    < RECENT_FAILURE_WINDOW.as_secs() as i64
            })
            .unwrap_or(false);
        if recent_failure {
            score *= 0.8;
        }

        score
    }

    /// Method names sorted by descending score, cached for five minutes.
    pub async fn get_method_priority(&self, candidates: &[String]) -> Vec<String> {
        {
            let cache = self.priority_cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if cached.computed_at.elapsed() < PRIORITY_CACHE_TTL {
                    return cached
                        .order
                        .iter()
                        .filter(|m| candidates.contains(m))
                        .cloned()
                        .collect();
                }
            }
        }

        let mut scored = Vec::with_capacity(candidates.len());
        for method in candidates {
            scored.push((method.clone(), self.score(method).await));
        }
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        let order: Vec<String> = scored.into_iter().map(|(m, _)| m).collect();

        *self.priority_cache.write().await = Some(CachedPriority {
            order: order.clone(),
            computed_at: Instant::now(),
        });

        order
    }

    pub async fn export_stats(&self) -> MethodStatsSnapshot {
        let methods = self.methods.read().await;
        MethodStatsSnapshot {
            methods: methods
                .iter()
                .map(|(name, tracked)| (name.clone(), tracked.stats.clone()))
                .collect(),
        }
    }

    pub async fn import_stats(&self, snapshot: MethodStatsSnapshot) {
        let mut methods = self.methods.write().await;
        for (name, stats) in snapshot.methods {
            let tracked = methods.entry(name).or_insert_with(Tracked::new);
            tracked.stats = stats;
        }
        *self.priority_cache.write().await = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn export_import_roundtrip_preserves_counters() {
        let monitor = HealthMonitor::new();
        monitor.record_attempt("m", true, 100, None).await;
        monitor.record_attempt("m", false, 200, Some("timeout exceeded")).await;

        let snapshot = monitor.export_stats().await;
        let json = serde_json::to_vec(&snapshot).unwrap();
        let restored: MethodStatsSnapshot = serde_json::from_slice(&json).unwrap();

        let monitor2 = HealthMonitor::new();
        monitor2.import_stats(restored).await;

        let exported = monitor2.export_stats().await;
        let stats = exported.methods.get("m").unwrap();
        assert_eq!(stats.success, 1);
        assert_eq!(stats.failure, 1);
        assert_eq!(stats.total_time_ms, 300);
        assert_eq!(stats.error_types.get(&ErrorClass::Timeout), Some(&1));
    }

    #[tokio::test]
    async fn unknown_method_gets_neutral_priority() {
        let monitor = HealthMonitor::new();
        let order = monitor
            .get_method_priority(&["a".to_string(), "b".to_string()])
            .await;
        assert_eq!(order.len(), 2);
    }

    #[tokio::test]
    async fn better_success_rate_ranks_first() {
        let monitor = HealthMonitor::new();
        for _ in 0..5 {
            monitor.record_attempt("good", true, 100, None).await;
        }
        for _ in 0..5 {
            monitor.record_attempt("bad", false, 100, Some("network down")).await;
        }
        let order = monitor
            .get_method_priority(&["bad".to_string(), "good".to_string()])
            .await;
        assert_eq!(order[0], "good");
    }
}
