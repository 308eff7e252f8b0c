//! Backend health probe.

use std::time::{Duration, Instant};

use tollgate_core::ports::KvStore;

/// Outcome of a single backend ping.
#[derive(Debug, Clone)]
pub struct BackendHealth {
    pub healthy: bool,
    pub latency: Duration,
    pub error: Option<String>,
}

/// Ping the backend once and report how it went. Never fails.
pub async fn check_backend(store: &dyn KvStore) -> BackendHealth {
    let started = Instant::now();
    let result = store.ping().await;
    let latency = started.elapsed();

    match result {
        Ok(()) => BackendHealth {
            healthy: true,
            latency,
            error: None,
        },
        Err(e) => {
            tracing::error!(error = %e, "Backend health check failed");
            BackendHealth {
                healthy: false,
                latency,
                error: Some(e.to_string()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::InMemoryKv;
    use crate::test_support::ScriptedKv;

    #[tokio::test]
    async fn test_healthy_backend() {
        let health = check_backend(&InMemoryKv::new()).await;
        assert!(health.healthy);
        assert!(health.error.is_none());
    }

    #[tokio::test]
    async fn test_unreachable_backend() {
        let health = check_backend(&ScriptedKv::unreachable()).await;
        assert!(!health.healthy);
        assert!(health.error.unwrap().contains("PING"));
    }
}
