//! Ports - trait definitions for external dependencies.
//! These are the "interfaces" that infrastructure must implement.

mod cache;
mod kv;
mod rate_limit;

pub use cache::CacheError;
pub use kv::{KvStore, StoreError};
pub use rate_limit::{RateLimitError, RateLimitResult, RateLimiter};
