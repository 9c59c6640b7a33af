//! Shared token-bucket rate limiter (§4.1, §5): capacity = configured
//! tokens-per-minute, refill = tokens-per-minute/60 per second. Guarded by
//! mutual exclusion at the reserve/consume boundary so it is safe to share
//! across concurrent callers within one process.

use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::warn;

struct BucketState {
    tokens: f64,
    capacity: f64,
    refill_per_second: f64,
    last_refill: Instant,
}

impl BucketState {
    fn refill(&mut self, now: Instant) {
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_per_second).min(self.capacity);
        self.last_refill = now;
    }
}

pub struct TokenBucket {
    state: Mutex<BucketState>,
}

impl TokenBucket {
    pub fn new(tokens_per_minute: u32) -> Self {
        let capacity = tokens_per_minute as f64;
        Self {
            state: Mutex::new(BucketState {
                tokens: capacity,
                capacity,
                refill_per_second: capacity / 60.0,
                last_refill: Instant::now(),
            }),
        }
    }

    /// Blocks until `amount` tokens are available, then deducts them.
    pub async fn reserve(&self, amount: f64) {
        loop {
            let wait = {
                let mut guard = self.state.lock().await;
                guard.refill(Instant::now());
                if guard.tokens >= amount {
                    guard.tokens -= amount;
                    return;
                }
                let deficit = amount - guard.tokens;
                Duration::from_secs_f64((deficit / guard.refill_per_second).max(0.01))
            };
            warn!(wait_ms = wait.as_millis() as u64, "rate-limit bucket exhausted, waiting for refill");
            sleep(wait).await;
        }
    }

    /// Reconciles the local bucket with the server's reported remaining
    /// value after a call — the server is authoritative (§4.1).
    pub async fn reconcile(&self, server_remaining: f64) {
        let mut guard = self.state.lock().await;
        guard.tokens = server_remaining.min(guard.capacity).max(0.0);
        guard.last_refill = Instant::now();
    }

    pub async fn tokens_remaining(&self) -> f64 {
        let mut guard = self.state.lock().await;
        guard.refill(Instant::now());
        guard.tokens
    }
}

/// Estimated token cost for one `fetch_products` call (§4.1): 1/listing
/// basic + 1/listing if history + 1/listing if offers.
pub fn estimate_fetch_cost(listing_count: usize, include_history: bool, include_offers: bool) -> f64 {
    let mut per_listing = 1.0;
    if include_history {
        per_listing += 1.0;
    }
    if include_offers {
        per_listing += 1.0;
    }
    listing_count as f64 * per_listing
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_reserve_deducts_available_tokens() {
        let bucket = TokenBucket::new(600);
        bucket.reserve(100.0).await;
        let remaining = bucket.tokens_remaining().await;
        assert!(remaining <= 500.0);
    }

    #[tokio::test]
    async fn test_reconcile_overrides_local_state() {
        let bucket = TokenBucket::new(600);
        bucket.reconcile(42.0).await;
        assert_eq!(bucket.tokens_remaining().await, 42.0);
    }

    #[test]
    fn test_estimate_fetch_cost() {
        assert_eq!(estimate_fetch_cost(10, false, false), 10.0);
        assert_eq!(estimate_fetch_cost(10, true, true), 30.0);
    }
}
