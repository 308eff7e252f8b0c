//! Rate limiting port.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::GateError;

/// Rate limiter trait - the ceiling check a request pipeline runs per request.
///
/// Errors are never converted into a decision here. The caller chooses between
/// rejecting the request (fail-closed) and letting it through (fail-open).
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Count a request against `key` and compare it to the ceiling.
    async fn check(&self, key: &str) -> Result<RateLimitResult, RateLimitError>;

    /// Give back one slot previously taken by `check`.
    async fn release(&self, key: &str) -> Result<(), RateLimitError>;
}

/// Result of a rate limit check.
#[derive(Debug, Clone)]
pub struct RateLimitResult {
    pub allowed: bool,
    pub limit: u32,
    pub count: u64,
    pub remaining: u32,
    pub reset_at: DateTime<Utc>,
    pub reset_after: Duration,
}

/// Rate limit errors.
#[derive(Debug, thiserror::Error)]
pub enum RateLimitError {
    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Invalid key: {0}")]
    InvalidKey(String),
}

impl From<GateError> for RateLimitError {
    fn from(err: GateError) -> Self {
        match err {
            GateError::EmptyKey => RateLimitError::InvalidKey("key must not be empty".to_string()),
            GateError::Store(e) => RateLimitError::Backend(e.to_string()),
        }
    }
}
