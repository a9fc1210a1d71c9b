//! Inventory ledger endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use inventory::{AdjustOutcome, InventoryLedger, InventoryRecord, ProductCode, StockAdjustment};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Shared state for the inventory service.
pub struct InventoryState {
    pub ledger: Arc<dyn InventoryLedger>,
}

impl InventoryState {
    /// Creates state around a ledger.
    pub fn new(ledger: Arc<dyn InventoryLedger>) -> Self {
        Self { ledger }
    }
}

#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TryAdjustRequest {
    pub product_code: ProductCode,
    pub delta: i64,
}

#[derive(Debug, Serialize)]
pub struct InsufficientStockResponse {
    pub error: String,
    pub available: i64,
}

/// GET /inventory: every record, sorted by product code.
pub async fn list(
    State(state): State<Arc<InventoryState>>,
) -> Result<Json<Vec<InventoryRecord>>, ApiError> {
    Ok(Json(state.ledger.list().await?))
}

/// GET /inventory/{productCode}/available?quantity=N: availability check.
pub async fn available(
    State(state): State<Arc<InventoryState>>,
    Path(product_code): Path<String>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<bool>, ApiError> {
    let available = state
        .ledger
        .check_available(&ProductCode::new(product_code), query.quantity)
        .await?;
    Ok(Json(available))
}

/// GET /inventory/{productCode}/quantity: current quantity, 0 if unknown.
pub async fn quantity(
    State(state): State<Arc<InventoryState>>,
    Path(product_code): Path<String>,
) -> Result<Json<i64>, ApiError> {
    let quantity = state
        .ledger
        .get_quantity(&ProductCode::new(product_code))
        .await?;
    Ok(Json(quantity))
}

/// POST /inventory/adjust: unconditional adjustment.
#[tracing::instrument(skip(state))]
pub async fn adjust(
    State(state): State<Arc<InventoryState>>,
    Json(req): Json<StockAdjustment>,
) -> Result<Json<InventoryRecord>, ApiError> {
    Ok(Json(state.ledger.adjust(req).await?))
}

/// POST /inventory/try-adjust: conditional adjustment; 409 when refused.
#[tracing::instrument(skip(state))]
pub async fn try_adjust(
    State(state): State<Arc<InventoryState>>,
    Json(req): Json<TryAdjustRequest>,
) -> Result<Response, ApiError> {
    if req.product_code.is_blank() {
        return Err(ApiError::BadRequest("product code is required".to_string()));
    }

    let response = match state.ledger.try_adjust(&req.product_code, req.delta).await? {
        AdjustOutcome::Applied(record) => Json(record).into_response(),
        AdjustOutcome::Insufficient { available } => (
            StatusCode::CONFLICT,
            Json(InsufficientStockResponse {
                error: format!("Insufficient stock for {}", req.product_code),
                available,
            }),
        )
            .into_response(),
    };
    Ok(response)
}
