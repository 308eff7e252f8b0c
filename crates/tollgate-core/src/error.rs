//! Error types surfaced by the counter gate.

use thiserror::Error;

use crate::ports::StoreError;

/// Counter gate errors.
///
/// Backend failures are passed through untouched; the gate never recovers locally.
#[derive(Debug, Error)]
pub enum GateError {
    #[error("Rate-limit key must not be empty")]
    EmptyKey,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl GateError {
    /// True when the failure came from the backend rather than caller misuse.
    pub fn is_backend(&self) -> bool {
        matches!(self, GateError::Store(_))
    }
}
