//! Health check endpoint.

use actix_web::{HttpResponse, web};
use tollgate_infra::check_backend;
use tollgate_shared::dto::{BackendStatus, HealthResponse};

use crate::state::AppState;

/// Health check endpoint - returns server and backend status.
///
/// GET /api/health
///
/// Answers `503` with status `"degraded"` when the key-value backend does not
/// respond, since rate limiting refuses requests in that state.
pub async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    let backend = check_backend(state.store.as_ref()).await;

    let response = HealthResponse {
        status: if backend.healthy { "ok" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        backend: BackendStatus {
            healthy: backend.healthy,
            latency_ms: backend.latency.as_millis() as u64,
            error: backend.error,
        },
    };

    if backend.healthy {
        HttpResponse::Ok().json(response)
    } else {
        HttpResponse::ServiceUnavailable().json(response)
    }
}
