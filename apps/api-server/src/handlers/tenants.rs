//! Tenant dashboard endpoints, served through the memoizer.

use actix_web::{HttpResponse, web};
use chrono::Utc;
use tollgate_shared::ApiResponse;
use tollgate_shared::dto::TenantOverview;

use crate::middleware::error::{AppError, AppResult};
use crate::observability::RequestId;
use crate::state::AppState;

const MAX_SLUG_LEN: usize = 63;

/// Tenant overview, cached for `CACHE_TTL_SECS`.
///
/// GET /api/tenants/{slug}/overview
pub async fn overview(
    state: web::Data<AppState>,
    path: web::Path<String>,
    request_id: web::ReqData<RequestId>,
) -> AppResult<HttpResponse> {
    let slug = path.into_inner();
    validate_slug(&slug)?;

    let overview = state
        .memoizer
        .cacheable(&overview_key(&slug), state.config.cache_ttl, || {
            build_overview(&state, &slug, request_id.as_str())
        })
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(overview)))
}

/// Drop the cached overview so the next read recomputes it.
///
/// DELETE /api/tenants/{slug}/overview
pub async fn invalidate_overview(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let slug = path.into_inner();
    validate_slug(&slug)?;

    state.memoizer.invalidate_cache(&overview_key(&slug)).await;

    Ok(HttpResponse::NoContent().finish())
}

fn overview_key(slug: &str) -> String {
    format!("tenant:{slug}:overview")
}

fn validate_slug(slug: &str) -> AppResult<()> {
    let valid = !slug.is_empty()
        && slug.len() <= MAX_SLUG_LEN
        && slug
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-');

    if valid {
        Ok(())
    } else {
        Err(AppError::BadRequest(format!("Invalid tenant slug: {slug}")))
    }
}

/// Stand-in for the dashboard aggregate; durable tenant data lives elsewhere.
async fn build_overview(
    state: &AppState,
    slug: &str,
    request_id: &str,
) -> AppResult<TenantOverview> {
    tracing::info!(tenant = %slug, request_id = %request_id, "Computing tenant overview");

    Ok(TenantOverview {
        tenant: slug.to_string(),
        generated_at: Utc::now(),
        request_ceiling: state.config.rate_limit.max_requests,
        window_secs: state.gate.window().as_secs(),
        cache_ttl_secs: state.config.cache_ttl.as_secs(),
    })
}
