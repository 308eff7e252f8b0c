//! Fixed-window counter gate.
//!
//! One counter per resource key lives at `rl:<key>` in the shared backend. The
//! first increment in a window creates the counter and attaches the window as
//! its TTL; the backend expiring the key is what opens the next window.
//!
//! The gate is fail-closed: every backend error is returned to the caller, with
//! no retries and no local fallback. An unreported failure here would silently
//! disable admission control, so the caller owns the allow/reject decision.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use tollgate_core::domain::window_secs;
use tollgate_core::ports::KvStore;
use tollgate_core::{GateError, Hit, KeyTtl};

/// Namespace of rate-limit counters in the shared backend.
pub const RATE_LIMIT_PREFIX: &str = "rl:";

/// Atomic, TTL-bounded counter per resource key.
#[derive(Clone)]
pub struct CounterGate {
    store: Arc<dyn KvStore>,
    window: Duration,
}

impl CounterGate {
    /// Build a gate over `store` counting in windows of `window`.
    ///
    /// The window is fixed for this instance. Counters created under another
    /// window keep the TTL they were given.
    pub fn new(store: Arc<dyn KvStore>, window: Duration) -> Self {
        Self { store, window }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Count one hit against `key` using the gate's window.
    pub async fn increment(&self, key: &str) -> Result<Hit, GateError> {
        self.increment_for(key, self.window).await
    }

    /// Count one hit against `key` in a window of `window`.
    ///
    /// The window only applies when this call creates the counter.
    pub async fn increment_for(&self, key: &str, window: Duration) -> Result<Hit, GateError> {
        let counter_key = counter_key(key)?;
        let secs = window_secs(window);

        let count = self.store.incr(&counter_key).await?;

        // INCR and EXPIRE are separate round trips. If the EXPIRE below is lost the
        // counter has no TTL; the Persistent branch further down re-arms it.
        if count == 1 {
            self.store.expire(&counter_key, secs).await?;
        }

        let ttl = self.store.ttl(&counter_key).await?;
        if ttl == KeyTtl::Persistent {
            tracing::warn!(key = %counter_key, count, "Counter had no expiry, re-applying window");
            self.store.expire(&counter_key, secs).await?;
        }

        let reset_after = ttl.remaining().unwrap_or(window);
        let next_reset = reset_time(Utc::now(), reset_after);

        tracing::debug!(key = %counter_key, count, %next_reset, "Counter incremented");

        Ok(Hit {
            count: count.max(0) as u64,
            next_reset,
        })
    }

    /// Give back one hit. A counter that drops to zero or below is deleted.
    pub async fn decrement(&self, key: &str) -> Result<(), GateError> {
        let counter_key = counter_key(key)?;

        let count = self.store.decr(&counter_key).await?;
        if count <= 0 {
            self.store.del(&[counter_key.clone()]).await?;
        }

        tracing::debug!(key = %counter_key, count, "Counter decremented");
        Ok(())
    }

    /// Delete the counter for `key`, or every counter when `key` is `None`.
    ///
    /// The namespace-wide form enumerates all `rl:` keys and is meant for
    /// maintenance and test teardown, never for the request path.
    pub async fn reset(&self, key: Option<&str>) -> Result<(), GateError> {
        let targets = match key {
            Some(key) => vec![counter_key(key)?],
            None => {
                self.store
                    .keys(&format!("{RATE_LIMIT_PREFIX}*"))
                    .await?
            }
        };

        if targets.is_empty() {
            return Ok(());
        }

        let removed = self.store.del(&targets).await?;
        tracing::debug!(removed, scope = key.unwrap_or("*"), "Counters reset");
        Ok(())
    }

    /// Wipe the whole counter namespace.
    pub async fn kill(&self) -> Result<(), GateError> {
        self.reset(None).await?;
        tracing::info!("Rate-limit namespace cleared");
        Ok(())
    }
}

fn counter_key(key: &str) -> Result<String, GateError> {
    if key.is_empty() {
        return Err(GateError::EmptyKey);
    }
    Ok(format!("{RATE_LIMIT_PREFIX}{key}"))
}

fn reset_time(now: DateTime<Utc>, after: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(after)
        .ok()
        .and_then(|d| now.checked_add_signed(d))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
