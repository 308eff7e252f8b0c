//! Store double for tests: counts round trips and injects failures per command.

use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use tollgate_core::KeyTtl;
use tollgate_core::ports::{KvStore, StoreError};

use crate::kv::InMemoryKv;

/// Wraps an [`InMemoryKv`]; every call counts as one round trip, and commands
/// marked with [`ScriptedKv::fail`] return a connection error instead.
pub struct ScriptedKv {
    pub inner: InMemoryKv,
    calls: AtomicUsize,
    failing: Mutex<HashSet<&'static str>>,
}

impl ScriptedKv {
    pub fn new() -> Self {
        Self {
            inner: InMemoryKv::new(),
            calls: AtomicUsize::new(0),
            failing: Mutex::new(HashSet::new()),
        }
    }

    /// A store whose every command fails, as if the backend were down.
    pub fn unreachable() -> Self {
        let kv = Self::new();
        for op in ["INCR", "DECR", "EXPIRE", "TTL", "GET", "SET", "DEL", "KEYS", "PING"] {
            kv.fail(op);
        }
        kv
    }

    pub fn fail(&self, op: &'static str) {
        self.failing.lock().unwrap().insert(op);
    }

    pub fn heal(&self, op: &'static str) {
        self.failing.lock().unwrap().remove(op);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn enter(&self, op: &'static str) -> Result<(), StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.lock().unwrap().contains(op) {
            return Err(StoreError::command(op, "connection refused"));
        }
        Ok(())
    }
}

#[async_trait]
impl KvStore for ScriptedKv {
    async fn incr(&self, key: &str) -> Result<i64, StoreError> {
        self.enter("INCR")?;
        self.inner.incr(key).await
    }

    async fn decr(&self, key: &str) -> Result<i64, StoreError> {
        self.enter("DECR")?;
        self.inner.decr(key).await
    }

    async fn expire(&self, key: &str, seconds: u64) -> Result<(), StoreError> {
        self.enter("EXPIRE")?;
        self.inner.expire(key, seconds).await
    }

    async fn ttl(&self, key: &str) -> Result<KeyTtl, StoreError> {
        self.enter("TTL")?;
        self.inner.ttl(key).await
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.enter("GET")?;
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), StoreError> {
        self.enter("SET")?;
        self.inner.set(key, value, ttl).await
    }

    async fn del(&self, keys: &[String]) -> Result<u64, StoreError> {
        self.enter("DEL")?;
        self.inner.del(keys).await
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>, StoreError> {
        self.enter("KEYS")?;
        self.inner.keys(pattern).await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.enter("PING")?;
        self.inner.ping().await
    }
}
