//! Middleware modules.

pub mod error;
pub mod rate_limit;

pub use rate_limit::{RateLimitMiddleware, RateLimitPolicy};
