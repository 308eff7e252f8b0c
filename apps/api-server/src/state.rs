//! Application state - shared across all handlers.

use std::sync::Arc;

use tollgate_core::ports::{KvStore, RateLimiter, StoreError};
use tollgate_infra::{CounterGate, FixedWindowRateLimiter, InMemoryKv, Memoizer, RedisConfig, RedisKv};

use crate::config::AppConfig;

/// Shared application state.
///
/// The backend handle is built once here and passed explicitly to the gate and
/// the memoizer; nothing else holds backend state.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn KvStore>,
    pub gate: CounterGate,
    pub limiter: Arc<dyn RateLimiter>,
    pub memoizer: Memoizer,
    pub config: Arc<AppConfig>,
}

impl AppState {
    /// Connect the configured backend and build the application state on top of it.
    pub async fn new(config: AppConfig) -> Result<Self, StoreError> {
        let store = connect_store(config.redis.as_ref()).await?;
        Ok(Self::with_store(store, config))
    }

    pub fn with_store(store: Arc<dyn KvStore>, config: AppConfig) -> Self {
        let gate = CounterGate::new(store.clone(), config.rate_limit.window);
        let limiter = Arc::new(FixedWindowRateLimiter::with_gate(
            gate.clone(),
            config.rate_limit.max_requests,
        ));
        let memoizer = Memoizer::new(store.clone());

        tracing::info!(
            max_requests = config.rate_limit.max_requests,
            window_secs = gate.window().as_secs(),
            cache_ttl_secs = config.cache_ttl.as_secs(),
            "Application state initialized"
        );

        Self {
            store,
            gate,
            limiter,
            memoizer,
            config: Arc::new(config),
        }
    }
}

async fn connect_store(redis: Option<&RedisConfig>) -> Result<Arc<dyn KvStore>, StoreError> {
    let Some(config) = redis else {
        tracing::warn!("REDIS_URL not set. Counters and cache are per-process (in-memory mode).");
        return Ok(Arc::new(InMemoryKv::new()));
    };

    match RedisKv::new(config).await {
        Ok(kv) => Ok(Arc::new(kv)),
        Err(e) if config.fallback_to_memory => {
            tracing::error!(
                "Failed to connect to Redis: {}. Using in-memory fallback.",
                e
            );
            Ok(Arc::new(InMemoryKv::new()))
        }
        Err(e) => Err(e),
    }
}
