//! # Tollgate Infrastructure
//!
//! Concrete implementations of the ports defined in `tollgate-core`:
//! key-value backends, the fixed-window counter gate, the cache-aside memoizer
//! and the ceiling-checking rate limiter built on the gate.
//!
//! ## Failure policy
//!
//! [`CounterGate`] is fail-closed and [`Memoizer`] is fail-open. The asymmetry is
//! intentional: do not make the gate swallow backend errors, or an outage turns
//! rate limiting off without anyone noticing.
//!
//! ## Feature Flags
//!
//! - `full` (default) - All features enabled
//! - `minimal` - Redis backend disabled, in-memory backend only
//! - `redis` - Redis backend

pub mod gate;
pub mod health;
pub mod kv;
pub mod memo;
pub mod rate_limit;

#[cfg(test)]
pub(crate) mod test_support;

pub use gate::CounterGate;
pub use health::{BackendHealth, check_backend};
pub use kv::InMemoryKv;
pub use memo::Memoizer;
pub use rate_limit::{FixedWindowRateLimiter, RateLimitConfig};

#[cfg(feature = "redis")]
pub use kv::{RedisConfig, RedisKv};
