//! Key-value backends - Redis and in-memory fallback.

mod memory;

pub use memory::InMemoryKv;

#[cfg(feature = "redis")]
mod redis;
#[cfg(feature = "redis")]
pub use self::redis::{RedisConfig, RedisKv};
