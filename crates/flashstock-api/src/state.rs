use std::sync::Arc;

use flashstock_core::cache::HotStore;
use flashstock_core::checkout::CheckoutCoordinator;
use flashstock_core::repository::Database;
use flashstock_core::reservation::ReservationEngine;
use flashstock_core::Config;

use crate::middleware::auth::IdentityProvider;
use crate::middleware::rate_limit::RateLimiter;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ReservationEngine>,
    pub checkout: Arc<CheckoutCoordinator>,
    pub identity: Arc<dyn IdentityProvider>,
    pub rate_limiter: Arc<dyn RateLimiter>,
    pub hot_store: HotStore,
    pub db: Database,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(
        engine: Arc<ReservationEngine>,
        checkout: Arc<CheckoutCoordinator>,
        identity: Arc<dyn IdentityProvider>,
        rate_limiter: Arc<dyn RateLimiter>,
        hot_store: HotStore,
        db: Database,
        config: Arc<Config>,
    ) -> Self {
        Self {
            engine,
            checkout,
            identity,
            rate_limiter,
            hot_store,
            db,
            config,
        }
    }
}
