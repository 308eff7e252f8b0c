//! Fixed-window rate limiter: the ceiling check on top of [`CounterGate`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use tollgate_core::ports::{KvStore, RateLimitError, RateLimitResult, RateLimiter};

use crate::gate::CounterGate;

/// Rate limiter configuration.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Maximum requests per window.
    pub max_requests: u32,
    /// Window duration.
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 100,
            window: Duration::from_secs(60),
        }
    }
}

impl RateLimitConfig {
    pub fn from_env() -> Self {
        Self {
            max_requests: std::env::var("RATE_LIMIT_MAX_REQUESTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(100),
            window: Duration::from_secs(
                std::env::var("RATE_LIMIT_WINDOW_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(60),
            ),
        }
    }
}

/// Admits up to `max_requests` hits per key per window.
///
/// Counts are shared by every process using the same backend. Windows are
/// fixed, so a burst straddling a boundary can reach twice the ceiling.
#[derive(Clone)]
pub struct FixedWindowRateLimiter {
    gate: CounterGate,
    max_requests: u32,
}

impl FixedWindowRateLimiter {
    pub fn new(store: Arc<dyn KvStore>, config: RateLimitConfig) -> Self {
        Self::with_gate(CounterGate::new(store, config.window), config.max_requests)
    }

    pub fn with_gate(gate: CounterGate, max_requests: u32) -> Self {
        Self { gate, max_requests }
    }
}

#[async_trait]
impl RateLimiter for FixedWindowRateLimiter {
    async fn check(&self, key: &str) -> Result<RateLimitResult, RateLimitError> {
        let hit = self.gate.increment(key).await?;

        let allowed = hit.count <= u64::from(self.max_requests);
        let remaining = u64::from(self.max_requests).saturating_sub(hit.count) as u32;

        if !allowed {
            tracing::debug!(key = %key, count = hit.count, limit = self.max_requests, "Ceiling exceeded");
        }

        Ok(RateLimitResult {
            allowed,
            limit: self.max_requests,
            count: hit.count,
            remaining,
            reset_after: hit.reset_after(),
            reset_at: hit.next_reset,
        })
    }

    async fn release(&self, key: &str) -> Result<(), RateLimitError> {
        self.gate.decrement(key).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::InMemoryKv;
    use crate::test_support::ScriptedKv;

    fn limiter(store: Arc<dyn KvStore>, max_requests: u32) -> FixedWindowRateLimiter {
        FixedWindowRateLimiter::new(
            store,
            RateLimitConfig {
                max_requests,
                window: Duration::from_secs(60),
            },
        )
    }

    #[tokio::test]
    async fn test_sixth_request_rejected() {
        let limiter = limiter(Arc::new(InMemoryKv::new()), 5);

        let mut results = Vec::new();
        for _ in 0..6 {
            results.push(limiter.check("user:42").await.unwrap());
        }

        let counts: Vec<u64> = results.iter().map(|r| r.count).collect();
        let decisions: Vec<bool> = results.iter().map(|r| r.allowed).collect();
        assert_eq!(counts, vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(decisions, vec![true, true, true, true, true, false]);

        let rejected = &results[5];
        assert_eq!(rejected.remaining, 0);
        assert!(rejected.reset_after >= Duration::from_secs(1));
        assert!(rejected.reset_after <= Duration::from_secs(60));

        let ahead = rejected.reset_at - chrono::Utc::now();
        assert!(ahead >= chrono::Duration::seconds(1));
        assert!(ahead <= chrono::Duration::seconds(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_rollover_admits_again() {
        let limiter = limiter(Arc::new(InMemoryKv::new()), 2);

        assert_eq!(limiter.check("k").await.unwrap().remaining, 1);
        assert_eq!(limiter.check("k").await.unwrap().remaining, 0);
        assert!(!limiter.check("k").await.unwrap().allowed);

        tokio::time::advance(Duration::from_secs(61)).await;
        assert!(limiter.check("k").await.unwrap().allowed);
    }

    #[tokio::test]
    async fn test_release_gives_slot_back() {
        let limiter = limiter(Arc::new(InMemoryKv::new()), 1);

        assert!(limiter.check("k").await.unwrap().allowed);
        limiter.release("k").await.unwrap();
        assert!(limiter.check("k").await.unwrap().allowed);
    }

    #[tokio::test]
    async fn test_backend_failure_is_an_error_not_a_decision() {
        let limiter = limiter(Arc::new(ScriptedKv::unreachable()), 5);

        assert!(matches!(
            limiter.check("k").await,
            Err(RateLimitError::Backend(_))
        ));
        assert!(matches!(
            limiter.check("").await,
            Err(RateLimitError::InvalidKey(_))
        ));
    }
}
