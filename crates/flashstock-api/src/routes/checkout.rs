//! Checkout routes: turn a held reservation into a durable order, or
//! release it back to the counter.

use axum::extract::{Extension, Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use flashstock_core::repository::{Order, OrderLine};

use crate::error::ApiError;
use crate::middleware::AuthContext;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ConfirmRequest {
    pub reservation_id: String,
}

#[derive(Debug, Deserialize)]
pub struct CancelRequest {
    pub reservation_id: String,
}

#[derive(Debug, Serialize)]
pub struct OrderLineResponse {
    pub sku: String,
    pub quantity: i64,
    pub price_per_unit: Decimal,
}

#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub order_id: String,
    pub user_id: String,
    pub status: String,
    pub total_amount: Decimal,
    pub created_at: DateTime<Utc>,
    pub items: Vec<OrderLineResponse>,
}

impl From<OrderLine> for OrderLineResponse {
    fn from(line: OrderLine) -> Self {
        Self {
            sku: line.sku,
            quantity: line.quantity,
            price_per_unit: line.price_per_unit,
        }
    }
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        Self {
            order_id: order.order_id,
            user_id: order.user_id,
            status: order.status,
            total_amount: order.total_amount,
            created_at: order.created_at,
            items: order.items.into_iter().map(Into::into).collect(),
        }
    }
}

pub async fn confirm(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<ConfirmRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = state
        .checkout
        .confirm(&auth.user_id, &request.reservation_id)
        .await?;

    Ok(Json(order.into()))
}

pub async fn cancel(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<CancelRequest>,
) -> Result<Json<Value>, ApiError> {
    state.engine.cancel(&auth.user_id, &request.reservation_id).await?;
    Ok(Json(json!({ "ok": true })))
}

pub async fn get_order(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = state.checkout.order(&order_id).await?;
    Ok(Json(order.into()))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/checkout/confirm", post(confirm))
        .route("/v1/checkout/cancel", post(cancel))
        .route("/v1/checkout/orders/:order_id", get(get_order))
}
