//! Outbound token-bucket rate limiting.
//!
//! Distinct from the inbound, per-IP `governor`-based limiter the API
//! layer applies to callers (`vclip_api::middleware::RateLimiterCache`):
//! this paces requests the process itself makes to a single shared
//! upstream (e.g. one Invidious/Piped network), one bucket per upstream
//! dependency rather than one per caller.

use std::num::NonZeroU32;
use std::sync::Arc;

use governor::{Quota, RateLimiter};

type Limiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// A single-upstream token bucket. `acquire()` suspends until a token is
/// available; it never returns without one.
pub struct TokenBucket {
    limiter: Limiter,
}

impl TokenBucket {
    /// `refill_per_second` tokens are added per second, up to `capacity`.
    pub fn new(refill_per_second: u32, capacity: u32) -> Arc<Self> {
        let refill = NonZeroU32::new(refill_per_second).unwrap_or_else(|| NonZeroU32::new(1).unwrap());
        let capacity = NonZeroU32::new(capacity).unwrap_or(refill);
        let quota = Quota::per_second(refill).allow_burst(capacity);
        Arc::new(Self {
            limiter: RateLimiter::direct(quota),
        })
    }

    pub fn with_defaults() -> Arc<Self> {
        Self::new(2, 10)
    }

    /// Suspends until a token is available, then consumes it.
    pub async fn acquire(&self) {
        self.limiter.until_ready().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn acquire_never_fails() {
        let bucket = TokenBucket::new(100, 1);
        for _ in 0..5 {
            tokio::time::timeout(Duration::from_secs(1), bucket.acquire())
                .await
                .expect("acquire should not hang past refill");
        }
    }
}
