//! Data Transfer Objects - request/response types for the API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Dashboard overview for one tenant. Served from the memoizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TenantOverview {
    pub tenant: String,
    /// When this overview was computed, not when it was served.
    pub generated_at: DateTime<Utc>,
    /// Request ceiling per window applied to this tenant's callers.
    pub request_ceiling: u32,
    pub window_secs: u64,
    /// How long this overview stays cached.
    pub cache_ttl_secs: u64,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: String,
    pub backend: BackendStatus,
}

/// Key-value backend status within a health check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendStatus {
    pub healthy: bool,
    pub latency_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
