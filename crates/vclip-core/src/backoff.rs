//! Jittered exponential backoff.

use std::time::Duration;

use rand::Rng;

#[derive(Debug, Clone, Copy)]
pub struct BackoffPolicy {
    pub base: Duration,
    pub max: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base: Duration::from_secs(1),
            max: Duration::from_secs(30),
        }
    }
}

impl BackoffPolicy {
    /// `delay = min(base * 2^attempt, max) + uniform(0, 0.3 * delay)`.
    pub fn delay(&self, attempt: u32) -> Duration {
        let exp = self.base.as_secs_f64() * 2f64.powi(attempt as i32);
        let capped = exp.min(self.max.as_secs_f64());
        let jitter = rand::thread_rng().gen_range(0.0..(0.3 * capped));
        Duration::from_secs_f64(capped + jitter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_grows_then_caps() {
        let policy = BackoffPolicy::default();
        assert!(policy.delay(0).as_secs_f64() >= 1.0);
        assert!(policy.delay(10).as_secs_f64() <= policy.max.as_secs_f64() * 1.3);
    }
}
