//! # Tollgate Core
//!
//! Ports and value types for the admission-control and cache-aside layer.
//! This crate has no infrastructure dependencies; backends live in `tollgate-infra`.
//!
//! Two failure policies coexist on purpose and must stay that way:
//!
//! - The counter gate is **fail-closed**. Every backend error reaches the caller, which
//!   decides whether to reject or admit the request. Turning the gate fail-open would let
//!   a backend outage silently disable rate limiting.
//! - The memoizer is **fail-open**. Cache read, write and invalidation failures degrade
//!   to recomputation and never fail the request.

pub mod domain;
pub mod error;
pub mod ports;

pub use domain::{CacheTtl, Hit, KeyTtl};
pub use error::GateError;
