//! Application configuration loaded from environment variables.

use std::env;

use tollgate_core::CacheTtl;
use tollgate_infra::{RateLimitConfig, RedisConfig};

use crate::middleware::rate_limit::RateLimitPolicy;

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// `None` when `REDIS_URL` is unset; the server then runs on the in-memory backend.
    pub redis: Option<RedisConfig>,
    pub rate_limit: RateLimitConfig,
    pub rate_limit_policy: RateLimitPolicy,
    /// Whether to wipe the `rl:` namespace after the server stops.
    pub reset_on_shutdown: bool,
    pub cache_ttl: CacheTtl,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            redis: env::var("REDIS_URL").ok().map(|_| RedisConfig::from_env()),
            rate_limit: RateLimitConfig::from_env(),
            rate_limit_policy: RateLimitPolicy::from_env(),
            reset_on_shutdown: flag("RATE_LIMIT_RESET_ON_SHUTDOWN"),
            cache_ttl: Self::parse_cache_ttl(),
        }
    }

    /// A zero or unparsable `CACHE_TTL_SECS` falls back to the default.
    fn parse_cache_ttl() -> CacheTtl {
        let secs = env::var("CACHE_TTL_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(CacheTtl::default().as_secs());

        CacheTtl::from_secs(secs).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Ignoring CACHE_TTL_SECS");
            CacheTtl::default()
        })
    }
}

/// Boolean env flag: `true` or `1` enables, anything else (or unset) disables.
pub(crate) fn flag(name: &str) -> bool {
    env::var(name)
        .map(|v| v == "true" || v == "1")
        .unwrap_or(false)
}
