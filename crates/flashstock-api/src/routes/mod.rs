pub mod checkout;
pub mod health;
pub mod inventory;
pub mod reservation;

use axum::middleware;
use axum::Router;

use crate::middleware::{auth_middleware, rate_limit_middleware};
use crate::state::AppState;

/// Builds the full API router. Health routes are public; everything that
/// touches stock or orders requires a verified bearer token and is subject
/// to the per-user rate limiter. Does not attach state — the caller
/// decides where in the stack `with_state` happens.
pub fn api_routes(app_state: AppState) -> Router<AppState> {
    let protected_routes = Router::new()
        .merge(inventory::router())
        .merge(reservation::router())
        .merge(checkout::router())
        .route_layer(middleware::from_fn_with_state(app_state.clone(), rate_limit_middleware))
        .route_layer(middleware::from_fn_with_state(app_state, auth_middleware));

    Router::new().merge(health::router()).merge(protected_routes)
}
