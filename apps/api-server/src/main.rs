//! # Tollgate API Server
//!
//! Actix-web entry point. Every request passes the rate-limit middleware
//! (fail-closed unless `RATE_LIMIT_FAIL_OPEN` is set) before reaching a handler;
//! handlers wrap expensive work in the fail-open memoizer.

use actix_web::{App, HttpServer, web};
use tracing_actix_web::TracingLogger;

mod config;
mod handlers;
mod middleware;
mod observability;
mod state;
mod telemetry;

use config::AppConfig;
use middleware::RateLimitMiddleware;
use observability::RequestIdMiddleware;
use state::AppState;
use telemetry::TelemetryConfig;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    telemetry::init_telemetry(&TelemetryConfig::from_env());

    let config = AppConfig::from_env();
    let (host, port) = (config.host.clone(), config.port);
    let policy = config.rate_limit_policy.clone();
    let reset_on_shutdown = config.reset_on_shutdown;

    tracing::info!("Starting Tollgate API Server on {}:{}", host, port);

    let state = AppState::new(config).await.map_err(|e| {
        tracing::error!("Failed to initialize backend: {}", e);
        std::io::Error::other(e)
    })?;
    let gate = state.gate.clone();

    HttpServer::new(move || {
        App::new()
            .wrap(RateLimitMiddleware::new(
                state.limiter.clone(),
                policy.clone(),
            ))
            .wrap(RequestIdMiddleware)
            .wrap(TracingLogger::default())
            .app_data(web::Data::new(state.clone()))
            .configure(handlers::configure_routes)
            .default_service(web::to(handlers::not_found))
    })
    .bind((host.as_str(), port))?
    .run()
    .await?;

    if reset_on_shutdown {
        if let Err(e) = gate.kill().await {
            tracing::error!("Failed to clear rate-limit counters on shutdown: {}", e);
        }
    }

    tracing::info!("Server stopped");
    Ok(())
}
