//! Liveness/readiness probes. `healthz` only proves the process is up;
//! `readyz` checks the backing stores so a load balancer can pull a node
//! that has lost Redis or Postgres out of rotation.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ReadinessResponse {
    pub redis: bool,
    pub postgres: bool,
}

pub async fn healthz() -> StatusCode {
    StatusCode::OK
}

pub async fn readyz(State(state): State<AppState>) -> (StatusCode, Json<ReadinessResponse>) {
    let redis = state.hot_store.health_check().await;
    let postgres = state.db.health_check().await;

    let status = if redis && postgres {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(ReadinessResponse { redis, postgres }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
}
