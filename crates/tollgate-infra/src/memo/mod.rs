//! Cache-aside memoizer over the shared backend.
//!
//! Entries live at `cache:<key>` as JSON. Every cache failure is fail-open:
//! a broken read is a miss, a broken write or invalidation is logged and
//! dropped. Only the wrapped computation's own error reaches the caller.

use std::future::Future;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;

use tollgate_core::CacheTtl;
use tollgate_core::ports::KvStore;

/// Namespace of memoized values in the shared backend.
pub const CACHE_PREFIX: &str = "cache:";

/// Read-through cache for asynchronous computations.
#[derive(Clone)]
pub struct Memoizer {
    store: Arc<dyn KvStore>,
}

impl Memoizer {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    /// Return the cached value for `key`, or run `compute` and cache its result for `ttl`.
    ///
    /// `compute` runs at most once per call, and its result is returned even when
    /// storing it fails. An `Err` from `compute` is returned as-is and nothing is cached.
    /// Concurrent misses on the same key all compute; the last write wins.
    pub async fn cacheable<T, E, F, Fut>(&self, key: &str, ttl: CacheTtl, compute: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let cache_key = cache_key(key);

        if let Some(value) = self.read(&cache_key).await {
            tracing::debug!(key = %cache_key, "Cache hit");
            return Ok(value);
        }

        tracing::debug!(key = %cache_key, "Cache miss");
        let value = compute().await?;
        self.write(&cache_key, &value, ttl).await;

        Ok(value)
    }

    /// Drop the cached value for `key`. Best effort.
    pub async fn invalidate_cache(&self, key: &str) {
        self.delete(vec![cache_key(key)]).await;
    }

    /// Drop several cached values in one round trip. Best effort; empty input is a no-op.
    pub async fn invalidate_cache_many<K: AsRef<str>>(&self, keys: &[K]) {
        if keys.is_empty() {
            return;
        }
        self.delete(keys.iter().map(|k| cache_key(k.as_ref())).collect())
            .await;
    }

    async fn read<T: DeserializeOwned>(&self, cache_key: &str) -> Option<T> {
        let raw = match self.store.get(cache_key).await {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::warn!(key = %cache_key, error = %e, "Cache read failed, recomputing");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(key = %cache_key, error = %e, "Cached payload unreadable, recomputing");
                None
            }
        }
    }

    async fn write<T: Serialize>(&self, cache_key: &str, value: &T, ttl: CacheTtl) {
        let payload = match serde_json::to_string(value) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(key = %cache_key, error = %e, "Value not serializable, skipping cache write");
                return;
            }
        };

        if let Err(e) = self
            .store
            .set(cache_key, &payload, Some(ttl.as_duration()))
            .await
        {
            tracing::warn!(key = %cache_key, error = %e, "Cache write failed");
        }
    }

    async fn delete(&self, cache_keys: Vec<String>) {
        match self.store.del(&cache_keys).await {
            Ok(removed) => tracing::debug!(removed, "Cache invalidated"),
            Err(e) => tracing::warn!(keys = ?cache_keys, error = %e, "Cache invalidation failed"),
        }
    }
}

fn cache_key(key: &str) -> String {
    format!("{CACHE_PREFIX}{key}")
}
