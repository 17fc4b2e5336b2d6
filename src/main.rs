//! URLGuard Backend Server
//!
//! Authenticated screening API wrapping a trained malicious-URL classifier
//! behind a cached, rate-limited prediction endpoint.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        URLGUARD                             │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌───────────┐  ┌───────────┐  ┌─────────────────────────┐ │
//! │  │  API      │  │  Auth     │  │  Audit Writer           │ │
//! │  │  Gateway  │  │  Service  │  │  (Background Task)      │ │
//! │  │  (Axum)   │  │  (JWT)    │  │                         │ │
//! │  └─────┬─────┘  └─────┬─────┘  └────────────┬────────────┘ │
//! │        │              │                      │              │
//! │  ┌─────┴─────┐  ┌─────┴─────┐               ▼              │
//! │  │  Result   │  │  Rate     │        ┌─────────────┐      │
//! │  │  Cache    │  │  Limiter  │        │ PostgreSQL  │      │
//! │  └─────┬─────┘  └───────────┘        └─────────────┘      │
//! │        ▼                                                   │
//! │  ┌────────────────────────────┐                            │
//! │  │  Classifier                │                            │
//! │  │  (artifact / heuristic /   │                            │
//! │  │   remote checker)          │                            │
//! │  └────────────────────────────┘                            │
//! └─────────────────────────────────────────────────────────────┘
//! ```

mod audit;
mod cache;
mod classifier;
mod config;
mod db;
mod error;
mod handlers;
mod middleware;
mod models;
mod rate_limit;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::{
    Router,
    routing::{get, post},
    middleware as axum_middleware,
};
use axum::http::HeaderValue;
use tower_http::{
    cors::{Any, AllowOrigin, CorsLayer},
    trace::TraceLayer,
    compression::CompressionLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub use error::{AppError, AppResult};

use audit::AuditSink;
use cache::ResultCache;
use classifier::Classifier;
use rate_limit::RateLimiter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "urlguard_server=debug,tower_http=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = config::Config::from_env();

    tracing::info!("URLGuard server starting...");
    tracing::info!("Database: {}", config.database_url.split('@').last().unwrap_or("***"));

    if config.is_production() && config.jwt_secret.contains("dev-secret") {
        tracing::warn!("Running in production with the default JWT secret");
    }

    // Initialize database pool
    let pool = db::create_pool(&config.database_url).await
        .context("Failed to create database pool")?;

    // Run migrations
    tracing::info!("Running database migrations...");
    db::run_migrations(&pool).await
        .context("Failed to run migrations")?;

    // Resolve the classifier once at startup
    let classifier = Arc::new(Classifier::from_config(&config));
    tracing::info!("Classifier ready (model version: {})", classifier.model_version());

    // Build application state
    let state = AppState {
        cache: ResultCache::new(Duration::from_secs(config.cache_ttl_seconds)),
        limiter: RateLimiter::new(config.rate_limit_per_minute),
        audit: AuditSink::spawn(pool.clone()),
        classifier,
        pool,
        config: config.clone(),
    };

    // Build router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await
        .context("Failed to bind listener")?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .await
        .context("Server error")?;

    Ok(())
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub pool: sqlx::PgPool,
    pub config: config::Config,
    pub classifier: Arc<Classifier>,
    pub cache: ResultCache,
    pub limiter: RateLimiter,
    pub audit: AuditSink,
}

/// Create the main router with all routes
fn create_router(state: AppState) -> Router {
    let cors_origins: Vec<HeaderValue> = state.config.cors_allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health/", get(handlers::health::check))
        .route("/api/v1/health/", get(handlers::health::check))
        .route("/api/v1/register/", post(handlers::auth::register))
        .route("/api/v1/token/", post(handlers::auth::token))
        .route("/api/v1/token/refresh/", post(handlers::auth::refresh));

    // Protected routes (user JWT auth)
    let protected_routes = Router::new()
        .route("/api/v1/me/", get(handlers::auth::me))
        .route("/api/v1/predict/", post(handlers::predict::predict))
        .route("/api/v1/predictions/", get(handlers::predictions::list))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_user_auth
        ));

    // Combine all routes
    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(cors_origins))
                .allow_methods(Any)
                .allow_headers(Any)
        )
        .with_state(state)
}
