//! Inventory routes: seed a SKU's counter, read its current level.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use flashstock_core::reservation::InventoryStatus;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct InitializeQuery {
    pub quantity: i64,
}

#[derive(Debug, Serialize)]
pub struct InventoryResponse {
    pub sku: String,
    pub available: i64,
    pub uninitialized: bool,
}

impl From<InventoryStatus> for InventoryResponse {
    fn from(status: InventoryStatus) -> Self {
        Self {
            sku: status.sku,
            available: status.available,
            uninitialized: status.uninitialized,
        }
    }
}

pub async fn initialize_inventory(
    State(state): State<AppState>,
    Path(sku): Path<String>,
    Query(query): Query<InitializeQuery>,
) -> Result<(StatusCode, Json<InventoryResponse>), ApiError> {
    let quantity = state.engine.initialize(&sku, query.quantity).await?;
    Ok((
        StatusCode::OK,
        Json(InventoryResponse {
            sku,
            available: quantity,
            uninitialized: false,
        }),
    ))
}

pub async fn get_inventory(
    State(state): State<AppState>,
    Path(sku): Path<String>,
) -> Result<Json<InventoryResponse>, ApiError> {
    let status = state.engine.status(&sku).await?;
    Ok(Json(status.into()))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/inventory/:sku/initialize", post(initialize_inventory))
        .route("/v1/inventory/:sku", get(get_inventory))
}
