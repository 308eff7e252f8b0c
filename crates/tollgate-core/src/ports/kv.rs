//! Key-value backend port - the capability surface the gate and memoizer need.

use std::time::Duration;

use async_trait::async_trait;

use crate::domain::KeyTtl;

/// Remote, process-shared key-value store with TTL support.
///
/// One handle is built at process start and shared (`Arc<dyn KvStore>`) by every
/// component. Implementations must be safe to call from many tasks at once; all
/// atomicity comes from the backend primitives, not from locks in the caller.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Atomically increment the integer at `key`, creating it at 1 if absent.
    async fn incr(&self, key: &str) -> Result<i64, StoreError>;

    /// Atomically decrement the integer at `key`, creating it at -1 if absent.
    async fn decr(&self, key: &str) -> Result<i64, StoreError>;

    /// Set or replace the expiry of `key`.
    async fn expire(&self, key: &str, seconds: u64) -> Result<(), StoreError>;

    /// Remaining lifetime of `key`.
    async fn ttl(&self, key: &str) -> Result<KeyTtl, StoreError>;

    /// Get a string value.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Set a string value with optional TTL.
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), StoreError>;

    /// Delete keys, returning how many existed.
    async fn del(&self, keys: &[String]) -> Result<u64, StoreError>;

    /// Enumerate keys matching a glob-style pattern.
    async fn keys(&self, pattern: &str) -> Result<Vec<String>, StoreError>;

    /// Round-trip liveness probe.
    async fn ping(&self) -> Result<(), StoreError>;
}

/// Backend errors. Only the place of failure is distinguished.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("{op} failed: {message}")]
    Command { op: &'static str, message: String },
}

impl StoreError {
    pub fn command(op: &'static str, err: impl std::fmt::Display) -> Self {
        StoreError::Command {
            op,
            message: err.to_string(),
        }
    }
}
