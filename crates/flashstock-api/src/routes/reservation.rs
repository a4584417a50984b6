//! Reservation route: the hot path. Holds stock against a SKU.

use axum::extract::{Extension, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use flashstock_core::reservation::ReserveOutcome;

use crate::error::ApiError;
use crate::middleware::AuthContext;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ReserveRequest {
    pub sku: String,
    pub quantity: i64,
}

#[derive(Debug, Serialize)]
pub struct ReserveResponse {
    pub reservation_id: String,
    pub sku: String,
    pub quantity: i64,
    pub expires_at: DateTime<Utc>,
    pub ttl_seconds: u64,
}

impl From<ReserveOutcome> for ReserveResponse {
    fn from(outcome: ReserveOutcome) -> Self {
        Self {
            reservation_id: outcome.reservation_id,
            sku: outcome.sku,
            quantity: outcome.quantity,
            expires_at: outcome.expires_at,
            ttl_seconds: outcome.ttl_seconds,
        }
    }
}

const IDEMPOTENCY_HEADER: &str = "X-Idempotency-Key";

pub async fn reserve(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    headers: HeaderMap,
    Json(request): Json<ReserveRequest>,
) -> Result<(StatusCode, Json<ReserveResponse>), ApiError> {
    let fingerprint = headers
        .get(IDEMPOTENCY_HEADER)
        .and_then(|h| h.to_str().ok());

    let outcome = state
        .engine
        .reserve_idempotent(&auth.user_id, &request.sku, request.quantity, fingerprint)
        .await?;

    Ok((StatusCode::CREATED, Json(outcome.into())))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/v1/inventory/reserve", post(reserve))
}
