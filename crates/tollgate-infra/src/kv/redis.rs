//! Redis key-value backend with automatic reconnection.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};

use tollgate_core::KeyTtl;
use tollgate_core::domain::window_secs;
use tollgate_core::ports::{KvStore, StoreError};

/// Redis connection configuration.
#[derive(Debug, Clone)]
pub struct RedisConfig {
    /// Redis URL (e.g., redis://localhost:6379)
    pub url: String,
    /// Connection timeout
    pub connect_timeout: Duration,
    /// Whether to fallback to the in-memory backend if Redis is unavailable
    pub fallback_to_memory: bool,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379".to_string(),
            connect_timeout: Duration::from_secs(5),
            fallback_to_memory: false,
        }
    }
}

impl RedisConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            url: std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            connect_timeout: Duration::from_secs(
                std::env::var("REDIS_CONNECT_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(5),
            ),
            fallback_to_memory: std::env::var("REDIS_FALLBACK_TO_MEMORY")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
        }
    }
}

/// Redis-backed store.
///
/// Wraps a single `ConnectionManager`; clones share the underlying multiplexed
/// connection, so one `RedisKv` serves every task in the process.
pub struct RedisKv {
    conn: ConnectionManager,
}

impl RedisKv {
    pub async fn new(config: &RedisConfig) -> Result<Self, StoreError> {
        let client =
            Client::open(config.url.as_str()).map_err(|e| StoreError::Connect(e.to_string()))?;

        // Use timeout to prevent hanging if Redis is unreachable
        let conn_manager_fut = ConnectionManager::new(client);
        let conn = tokio::time::timeout(config.connect_timeout, conn_manager_fut)
            .await
            .map_err(|_| StoreError::Connect("Connection timed out".to_string()))?
            .map_err(|e| StoreError::Connect(e.to_string()))?;

        tracing::info!(url = %config.url, "Connected to Redis");

        Ok(Self { conn })
    }

    /// Create from environment configuration.
    pub async fn from_env() -> Result<Self, StoreError> {
        Self::new(&RedisConfig::from_env()).await
    }
}

#[async_trait]
impl KvStore for RedisKv {
    async fn incr(&self, key: &str) -> Result<i64, StoreError> {
        let mut conn = self.conn.clone();
        conn.incr::<_, _, i64>(key, 1)
            .await
            .map_err(|e| StoreError::command("INCR", e))
    }

    async fn decr(&self, key: &str) -> Result<i64, StoreError> {
        let mut conn = self.conn.clone();
        conn.decr::<_, _, i64>(key, 1)
            .await
            .map_err(|e| StoreError::command("DECR", e))
    }

    async fn expire(&self, key: &str, seconds: u64) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let _: i64 = redis::cmd("EXPIRE")
            .arg(key)
            .arg(seconds)
            .query_async(&mut conn)
            .await
            .map_err(|e| StoreError::command("EXPIRE", e))?;
        Ok(())
    }

    async fn ttl(&self, key: &str) -> Result<KeyTtl, StoreError> {
        let mut conn = self.conn.clone();
        let reply = conn
            .ttl::<_, i64>(key)
            .await
            .map_err(|e| StoreError::command("TTL", e))?;
        Ok(KeyTtl::from_redis_reply(reply))
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.conn.clone();
        conn.get::<_, Option<String>>(key)
            .await
            .map_err(|e| StoreError::command("GET", e))
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();

        match ttl {
            Some(duration) => {
                conn.set_ex::<_, _, ()>(key, value, window_secs(duration))
                    .await
                    .map_err(|e| StoreError::command("SETEX", e))?;
            }
            None => {
                conn.set::<_, _, ()>(key, value)
                    .await
                    .map_err(|e| StoreError::command("SET", e))?;
            }
        }

        Ok(())
    }

    async fn del(&self, keys: &[String]) -> Result<u64, StoreError> {
        // DEL with no arguments is a protocol error.
        if keys.is_empty() {
            return Ok(0);
        }

        let mut conn = self.conn.clone();
        conn.del::<_, u64>(keys)
            .await
            .map_err(|e| StoreError::command("DEL", e))
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>, StoreError> {
        let mut conn = self.conn.clone();
        conn.keys::<_, Vec<String>>(pattern)
            .await
            .map_err(|e| StoreError::command("KEYS", e))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| StoreError::command("PING", e))?;
        Ok(())
    }
}
