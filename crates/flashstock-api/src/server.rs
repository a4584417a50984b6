use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tower_http::trace::TraceLayer;
use tracing::info;

use flashstock_core::cache::HotStore;
use flashstock_core::checkout::CheckoutCoordinator;
use flashstock_core::repository::{
    create_pool, Database, PostgresAuditRepository, PostgresOrderRepository,
};
use flashstock_core::reservation::ReservationEngine;
use flashstock_core::{Config, Error, Result};

use crate::middleware::{JwtIdentityProvider, RedisRateLimiter};
use crate::routes::api_routes;
use crate::state::AppState;

/// Builds application state, the router, and serves it on `config.server`.
/// Migrations and the expiry sweeper are the binary entrypoint's
/// responsibility, not the API layer's — `run` only ever needs a state to
/// mount routes against.
pub async fn run(config: Config) -> Result<()> {
    let addr = SocketAddr::from((
        config
            .server
            .host
            .parse::<std::net::IpAddr>()
            .map_err(|e| Error::config(format!("invalid host: {}", e)))?,
        config.server.port,
    ));

    let app_state = create_app_state(&config).await?;
    let app = build_router(app_state);

    info!(%addr, "flashstock API listening");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| Error::backend_unavailable(format!("failed to bind {}: {}", addr, e)))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| Error::Other(format!("server error: {}", e)))?;

    Ok(())
}

fn build_router(app_state: AppState) -> Router {
    Router::new()
        .merge(api_routes(app_state.clone()))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

async fn create_app_state(config: &Config) -> Result<AppState> {
    info!("connecting to postgres");
    let pg_pool = create_pool(&config.database).await?;
    let database = Database::new(pg_pool.clone());

    info!("connecting to redis");
    let hot_store = HotStore::new(config.redis.clone()).await?;

    let audit: Arc<dyn flashstock_core::repository::AuditRepository> =
        Arc::new(PostgresAuditRepository::new(pg_pool.clone()));
    let orders: Arc<dyn flashstock_core::repository::OrderRepository> =
        Arc::new(PostgresOrderRepository::new(pg_pool));

    let engine = Arc::new(ReservationEngine::new(
        hot_store.clone(),
        config.reservation.clone(),
        audit.clone(),
    ));
    let checkout = Arc::new(CheckoutCoordinator::new(hot_store.clone(), orders, audit));

    let identity = Arc::new(JwtIdentityProvider::new(&config.jwt.secret));
    let rate_limiter = Arc::new(RedisRateLimiter::new(hot_store.clone(), &config.rate_limit));

    Ok(AppState::new(
        engine,
        checkout,
        identity,
        rate_limiter,
        hot_store,
        database,
        Arc::new(config.clone()),
    ))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutdown signal received");
}
