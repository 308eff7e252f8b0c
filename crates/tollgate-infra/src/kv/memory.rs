//! In-memory key-value backend - used as fallback when Redis is unavailable
//! and as the backend for tests.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::time::Instant;

use tollgate_core::KeyTtl;
use tollgate_core::ports::{KvStore, StoreError};

struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.map(|exp| now >= exp).unwrap_or(false)
    }
}

/// In-memory store using a `HashMap` behind an async `RwLock`.
///
/// Mirrors the Redis semantics the gate and memoizer rely on: `INCR` keeps an
/// existing TTL, `EXPIRE 0` deletes, `TTL` rounds to the nearest second.
/// Expiry follows the tokio clock, so paused-time tests can fast-forward it.
/// Counters are per-process, not shared across instances.
pub struct InMemoryKv {
    store: RwLock<HashMap<String, Entry>>,
}

impl InMemoryKv {
    pub fn new() -> Self {
        Self {
            store: RwLock::new(HashMap::new()),
        }
    }

    async fn add(&self, op: &'static str, key: &str, delta: i64) -> Result<i64, StoreError> {
        let now = Instant::now();
        let mut store = self.store.write().await;

        if store.get(key).is_some_and(|e| e.is_expired(now)) {
            store.remove(key);
        }

        let entry = store.entry(key.to_string()).or_insert_with(|| Entry {
            value: "0".to_string(),
            expires_at: None,
        });

        let current: i64 = entry
            .value
            .parse()
            .map_err(|_| StoreError::command(op, "value is not an integer or out of range"))?;
        let next = current
            .checked_add(delta)
            .ok_or_else(|| StoreError::command(op, "increment or decrement would overflow"))?;

        entry.value = next.to_string();
        Ok(next)
    }
}

impl Default for InMemoryKv {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KvStore for InMemoryKv {
    async fn incr(&self, key: &str) -> Result<i64, StoreError> {
        self.add("INCR", key, 1).await
    }

    async fn decr(&self, key: &str) -> Result<i64, StoreError> {
        self.add("DECR", key, -1).await
    }

    async fn expire(&self, key: &str, seconds: u64) -> Result<(), StoreError> {
        let now = Instant::now();
        let mut store = self.store.write().await;

        let live = store.get(key).is_some_and(|e| !e.is_expired(now));
        if !live || seconds == 0 {
            store.remove(key);
        } else if let Some(entry) = store.get_mut(key) {
            entry.expires_at = Some(expiry("EXPIRE", now, Duration::from_secs(seconds))?);
        }

        Ok(())
    }

    async fn ttl(&self, key: &str) -> Result<KeyTtl, StoreError> {
        let now = Instant::now();
        let store = self.store.read().await;

        let ttl = match store.get(key) {
            None => KeyTtl::Missing,
            Some(entry) if entry.is_expired(now) => KeyTtl::Missing,
            Some(Entry {
                expires_at: None, ..
            }) => KeyTtl::Persistent,
            Some(Entry {
                expires_at: Some(exp),
                ..
            }) => {
                let millis = exp.duration_since(now).as_millis() as u64;
                KeyTtl::Expires((millis + 500) / 1000)
            }
        };

        Ok(ttl)
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let now = Instant::now();
        let store = self.store.read().await;

        Ok(store
            .get(key)
            .filter(|e| !e.is_expired(now))
            .map(|e| e.value.clone()))
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), StoreError> {
        if ttl.is_some_and(|d| d.is_zero()) {
            return Err(StoreError::command("SET", "invalid expire time"));
        }

        let expires_at = ttl
            .map(|d| expiry("SET", Instant::now(), d))
            .transpose()?;
        let mut store = self.store.write().await;

        store.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at,
            },
        );

        Ok(())
    }

    async fn del(&self, keys: &[String]) -> Result<u64, StoreError> {
        let now = Instant::now();
        let mut store = self.store.write().await;

        let removed = keys
            .iter()
            .filter_map(|key| store.remove(key))
            .filter(|entry| !entry.is_expired(now))
            .count();

        Ok(removed as u64)
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>, StoreError> {
        let now = Instant::now();
        let store = self.store.read().await;

        let mut matched: Vec<String> = store
            .iter()
            .filter(|(key, entry)| !entry.is_expired(now) && glob_match(pattern, key))
            .map(|(key, _)| key.clone())
            .collect();
        matched.sort();

        Ok(matched)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Deadline `ttl` from `now`; a TTL past the clock's range is rejected like Redis does.
fn expiry(op: &'static str, now: Instant, ttl: Duration) -> Result<Instant, StoreError> {
    now.checked_add(ttl)
        .ok_or_else(|| StoreError::command(op, "invalid expire time"))
}

/// Redis-style glob: `*` any run, `?` any single char, `\` escapes the next char.
fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();

    let (mut p, mut t) = (0, 0);
    // Last `*` seen and the text position it was tried against.
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        match pattern.get(p) {
            Some('*') => {
                backtrack = Some((p, t));
                p += 1;
                continue;
            }
            Some('?') => {
                p += 1;
                t += 1;
                continue;
            }
            Some('\\') if pattern.get(p + 1) == Some(&text[t]) => {
                p += 2;
                t += 1;
                continue;
            }
            Some(c) if *c != '\\' && *c == text[t] => {
                p += 1;
                t += 1;
                continue;
            }
            _ => {}
        }

        match backtrack {
            Some((star, tried)) => {
                p = star + 1;
                t = tried + 1;
                backtrack = Some((star, tried + 1));
            }
            None => return false,
        }
    }

    pattern[p..].iter().all(|c| *c == '*')
}
