//! Per-instance health tracking for interchangeable mirror pools
//! (Invidious/Piped). Distinct from `CircuitBreakerRegistry`: that gates a
//! *method*, this gates *one endpoint within a method*.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::seq::SliceRandom;
use tokio::sync::RwLock;

struct InstanceState {
    consecutive_failures: u32,
    last_failure_at: Option<Instant>,
    is_healthy: bool,
}

impl Default for InstanceState {
    fn default() -> Self {
        Self {
            consecutive_failures: 0,
            last_failure_at: None,
            is_healthy: true,
        }
    }
}

pub struct InstanceHealthRegistry {
    instances: RwLock<HashMap<String, InstanceState>>,
    unhealthy_threshold: u32,
    recheck_interval: Duration,
}

impl InstanceHealthRegistry {
    pub fn new(unhealthy_threshold: u32, recheck_interval: Duration) -> Arc<Self> {
        Arc::new(Self {
            instances: RwLock::new(HashMap::new()),
            unhealthy_threshold,
            recheck_interval,
        })
    }

    pub fn with_defaults() -> Arc<Self> {
        Self::new(3, Duration::from_secs(600))
    }

    pub async fn record_success(&self, url: &str) {
        let mut instances = self.instances.write().await;
        let state = instances.entry(url.to_string()).or_default();
        state.consecutive_failures = 0;
        state.is_healthy = true;
    }

    pub async fn record_failure(&self, url: &str) {
        let mut instances = self.instances.write().await;
        let state = instances.entry(url.to_string()).or_default();
        state.consecutive_failures += 1;
        state.last_failure_at = Some(Instant::now());
        if state.consecutive_failures >= self.unhealthy_threshold {
            state.is_healthy = false;
        }
    }

    async fn is_healthy(&self, url: &str) -> bool {
        let instances = self.instances.read().await;
        match instances.get(url) {
            None => true,
            Some(state) if state.is_healthy => true,
            Some(state) => state
                .last_failure_at
                .map(|t| t.elapsed() >= self.recheck_interval)
                .unwrap_or(true),
        }
    }

    /// Returns instances from `candidates`, healthy ones first (shuffled
    /// for load spreading), unhealthy ones appended as a last resort.
    pub async fn get_healthy_instances(&self, candidates: &[String]) -> Vec<String> {
        let mut healthy = Vec::new();
        let mut unhealthy = Vec::new();
        for url in candidates {
            if self.is_healthy(url).await {
                healthy.push(url.clone());
            } else {
                unhealthy.push(url.clone());
            }
        }
        healthy.shuffle(&mut rand::thread_rng());
        healthy.extend(unhealthy);
        healthy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn marks_unhealthy_after_threshold() {
        let registry = InstanceHealthRegistry::new(2, Duration::from_secs(600));
        registry.record_failure("a").await;
        assert!(registry.is_healthy("a").await);
        registry.record_failure("a").await;
        assert!(!registry.is_healthy("a").await);
    }

    #[tokio::test]
    async fn success_clears_unhealthy() {
        let registry = InstanceHealthRegistry::new(1, Duration::from_secs(600));
        registry.record_failure("a").await;
        assert!(!registry.is_healthy("a").await);
        registry.record_success("a").await;
        assert!(registry.is_healthy("a").await);
    }

    #[tokio::test]
    async fn healthy_instances_come_first() {
        let registry = InstanceHealthRegistry::new(1, Duration::from_secs(600));
        registry.record_failure("bad").await;
        let ordered = registry
            .get_healthy_instances(&["bad".to_string(), "good".to_string()])
            .await;
        assert_eq!(ordered.last().unwrap(), "bad");
    }

    #[tokio::test]
    async fn recheck_interval_reactivates() {
        let registry = InstanceHealthRegistry::new(1, Duration::from_millis(10));
        registry.record_failure("a").await;
        assert!(!registry.is_healthy("a").await);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(registry.is_healthy("a").await);
    }
}
