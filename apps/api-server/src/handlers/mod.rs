//! HTTP handlers and route configuration.

mod health;
mod tenants;

use actix_web::{HttpResponse, web};

use crate::middleware::error::{AppError, AppResult};

/// Configure all application routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/health", web::get().to(health::health_check))
            .service(
                web::resource("/tenants/{slug}/overview")
                    .route(web::get().to(tenants::overview))
                    .route(web::delete().to(tenants::invalidate_overview)),
            ),
    );
}

/// Fallback for unmatched routes.
pub async fn not_found() -> AppResult<HttpResponse> {
    Err(AppError::NotFound("No such route".to_string()))
}
