//! Per-method circuit breaker registry.
//!
//! Tracks *consecutive* failures per method name (not the teacher's
//! open-on-any-single-failure behavior, which doesn't match the
//! resilience model this orchestrator needs): five in a row opens the
//! circuit, a five-minute cooldown allows one probe, and that probe's
//! outcome decides whether the circuit closes or reopens.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use vclip_models::CircuitState;

struct MethodCircuit {
    state: CircuitState,
    consecutive_failures: u32,
    last_failure_at: Option<Instant>,
}

impl Default for MethodCircuit {
    fn default() -> Self {
        Self {
            state: CircuitState::Closed,
            consecutive_failures: 0,
            last_failure_at: None,
        }
    }
}

pub struct CircuitBreakerRegistry {
    circuits: RwLock<HashMap<String, MethodCircuit>>,
    failure_threshold: u32,
    recovery_timeout: Duration,
}

impl CircuitBreakerRegistry {
    pub fn new(failure_threshold: u32, recovery_timeout: Duration) -> Arc<Self> {
        Arc::new(Self {
            circuits: RwLock::new(HashMap::new()),
            failure_threshold,
            recovery_timeout,
        })
    }

    pub fn with_defaults() -> Arc<Self> {
        Self::new(5, Duration::from_secs(300))
    }

    /// Whether `method` may be attempted right now. Moves OPEN -> HALF_OPEN
    /// when the recovery window has elapsed, but does not itself record a
    /// failure for skipped attempts.
    pub async fn can_execute(&self, method: &str) -> bool {
        let mut circuits = self.circuits.write().await;
        let circuit = circuits.entry(method.to_string()).or_default();

        match circuit.state {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let elapsed_enough = circuit
                    .last_failure_at
                    .map(|t| t.elapsed() >= self.recovery_timeout)
                    .unwrap_or(true);
                if elapsed_enough {
                    circuit.state = CircuitState::HalfOpen;
                    true
                } else {
                    false
                }
            }
        }
    }

    pub async fn record_success(&self, method: &str) {
        let mut circuits = self.circuits.write().await;
        let circuit = circuits.entry(method.to_string()).or_default();
        circuit.consecutive_failures = 0;
        circuit.state = CircuitState::Closed;
    }

    pub async fn record_failure(&self, method: &str) {
        let mut circuits = self.circuits.write().await;
        let circuit = circuits.entry(method.to_string()).or_default();
        circuit.last_failure_at = Some(Instant::now());

        match circuit.state {
            CircuitState::HalfOpen => {
                circuit.state = CircuitState::Open;
            }
            CircuitState::Closed => {
                circuit.consecutive_failures += 1;
                if circuit.consecutive_failures >= self.failure_threshold {
                    circuit.state = CircuitState::Open;
                }
            }
            CircuitState::Open => {}
        }
    }

    pub async fn state(&self, method: &str) -> CircuitState {
        self.circuits
            .read()
            .await
            .get(method)
            .map(|c| c.state)
            .unwrap_or(CircuitState::Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn opens_after_consecutive_failures() {
        let registry = CircuitBreakerRegistry::new(3, Duration::from_secs(300));
        for _ in 0..2 {
            registry.record_failure("m").await;
        }
        assert_eq!(registry.state("m").await, CircuitState::Closed);
        registry.record_failure("m").await;
        assert_eq!(registry.state("m").await, CircuitState::Open);
        assert!(!registry.can_execute("m").await);
    }

    #[tokio::test]
    async fn success_resets_failure_count() {
        let registry = CircuitBreakerRegistry::new(3, Duration::from_secs(300));
        registry.record_failure("m").await;
        registry.record_failure("m").await;
        registry.record_success("m").await;
        registry.record_failure("m").await;
        registry.record_failure("m").await;
        assert_eq!(registry.state("m").await, CircuitState::Closed);
    }

    #[tokio::test]
    async fn half_open_failure_reopens() {
        let registry = CircuitBreakerRegistry::new(1, Duration::from_millis(10));
        registry.record_failure("m").await;
        assert_eq!(registry.state("m").await, CircuitState::Open);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(registry.can_execute("m").await);
        assert_eq!(registry.state("m").await, CircuitState::HalfOpen);
        registry.record_failure("m").await;
        assert_eq!(registry.state("m").await, CircuitState::Open);
    }

    #[tokio::test]
    async fn half_open_success_closes() {
        let registry = CircuitBreakerRegistry::new(1, Duration::from_millis(10));
        registry.record_failure("m").await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(registry.can_execute("m").await);
        registry.record_success("m").await;
        assert_eq!(registry.state("m").await, CircuitState::Closed);
    }
}
