/// Memoizer errors.
///
/// Only caller misuse escapes the memoizer; backend and serialization
/// failures are downgraded to cache misses.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Cache TTL must be a positive number of seconds, got {0}")]
    InvalidTtl(u64),
}
