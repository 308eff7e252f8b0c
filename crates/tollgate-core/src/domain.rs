//! Value types shared by the gate, the memoizer and their consumers.

use std::num::NonZeroU64;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::ports::CacheError;

/// Remaining lifetime of a backend key, as reported by `TTL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyTtl {
    /// The key does not exist.
    Missing,
    /// The key exists but has no expiry attached.
    Persistent,
    /// The key expires in this many seconds.
    Expires(u64),
}

impl KeyTtl {
    /// Decode the integer reply of a Redis `TTL` command.
    pub fn from_redis_reply(reply: i64) -> Self {
        match reply {
            -1 => KeyTtl::Persistent,
            n if n < 0 => KeyTtl::Missing,
            n => KeyTtl::Expires(n as u64),
        }
    }

    /// Remaining seconds, when positive.
    pub fn remaining(&self) -> Option<Duration> {
        match self {
            KeyTtl::Expires(secs) if *secs > 0 => Some(Duration::from_secs(*secs)),
            _ => None,
        }
    }
}

/// Outcome of a single counter increment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hit {
    /// Counter value after this increment.
    pub count: u64,
    /// When the current window ends. Never in the past at the time it is produced.
    pub next_reset: DateTime<Utc>,
}

impl Hit {
    /// Time left until `next_reset`, clamped at zero.
    pub fn reset_after(&self) -> Duration {
        (self.next_reset - Utc::now()).to_std().unwrap_or(Duration::ZERO)
    }
}

/// A strictly positive cache lifetime in whole seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheTtl(NonZeroU64);

impl CacheTtl {
    pub const FIVE_MINUTES: CacheTtl = match NonZeroU64::new(300) {
        Some(secs) => CacheTtl(secs),
        None => unreachable!(),
    };

    pub fn from_secs(secs: u64) -> Result<Self, CacheError> {
        NonZeroU64::new(secs)
            .map(Self)
            .ok_or(CacheError::InvalidTtl(secs))
    }

    pub fn as_secs(&self) -> u64 {
        self.0.get()
    }

    pub fn as_duration(&self) -> Duration {
        Duration::from_secs(self.0.get())
    }
}

impl Default for CacheTtl {
    fn default() -> Self {
        Self::FIVE_MINUTES
    }
}

/// Whole seconds covering `window`, never less than one.
pub fn window_secs(window: Duration) -> u64 {
    let secs = window.as_secs() + u64::from(window.subsec_nanos() > 0);
    secs.max(1)
}
