//! Order endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use common::{OrderId, ProductCode};
use domain::Order;
use order_store::{OrderStore, UserOrderCount};
use saga::{InventoryClient, OrderOrchestrator, PlaceOrder, PlacedOrder};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Order orchestrator as wired by the order service.
pub type Orchestrator = OrderOrchestrator<Arc<dyn OrderStore>, Arc<dyn InventoryClient>>;

/// Shared application state accessible from all order handlers.
pub struct AppState {
    pub orchestrator: Orchestrator,
}

impl AppState {
    /// Creates state around an order store and an inventory client.
    pub fn new(store: Arc<dyn OrderStore>, inventory: Arc<dyn InventoryClient>) -> Self {
        Self {
            orchestrator: OrderOrchestrator::new(store, inventory),
        }
    }
}

// -- Request types --

#[derive(Debug, Deserialize)]
pub struct AmendQuantityRequest {
    pub quantity: i64,
}

// -- Response types --

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderView {
    pub id: OrderId,
    pub order_number: String,
    pub username: String,
    pub status: String,
    pub line_items: Vec<LineItemView>,
    pub total_cents: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItemView {
    pub product_code: String,
    pub price_cents: i64,
    pub quantity: u32,
}

impl From<&Order> for OrderView {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id(),
            order_number: order.order_number().to_string(),
            username: order.username().to_string(),
            status: order.status().to_string(),
            line_items: order
                .line_items()
                .iter()
                .map(|item| LineItemView {
                    product_code: item.product_code.to_string(),
                    price_cents: item.price.cents(),
                    quantity: item.quantity,
                })
                .collect(),
            total_cents: order.total_amount().cents(),
            created_at: order.created_at(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOrderCountView {
    pub username: String,
    pub order_count: u64,
}

impl From<UserOrderCount> for UserOrderCountView {
    fn from(count: UserOrderCount) -> Self {
        Self {
            username: count.username,
            order_count: count.order_count,
        }
    }
}

// -- Handlers --

/// POST /orders: place an order and reserve its stock.
#[tracing::instrument(skip(state, req))]
pub async fn place(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PlaceOrder>,
) -> Result<(StatusCode, Json<PlacedOrder>), ApiError> {
    let placed = state.orchestrator.place(req).await?;
    Ok((StatusCode::CREATED, Json(placed)))
}

/// GET /orders: list every order.
pub async fn list(State(state): State<Arc<AppState>>) -> Result<Json<Vec<OrderView>>, ApiError> {
    let orders = state.orchestrator.list().await?;
    Ok(Json(orders.iter().map(OrderView::from).collect()))
}

/// GET /orders/{id}: load one order.
pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<OrderView>, ApiError> {
    let order = state.orchestrator.get(parse_order_id(&id)?).await?;
    Ok(Json(OrderView::from(&order)))
}

/// GET /users/{username}/orders: list one user's orders.
pub async fn list_by_username(
    State(state): State<Arc<AppState>>,
    Path(username): Path<String>,
) -> Result<Json<Vec<OrderView>>, ApiError> {
    let orders = state.orchestrator.list_by_username(&username).await?;
    Ok(Json(orders.iter().map(OrderView::from).collect()))
}

/// POST /orders/{id}/validate: mark a pending order as validated.
#[tracing::instrument(skip(state))]
pub async fn validate(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.orchestrator.validate(parse_order_id(&id)?).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /orders/{id}/cancel: cancel an order and restore its stock.
#[tracing::instrument(skip(state))]
pub async fn cancel(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.orchestrator.cancel(parse_order_id(&id)?).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /orders/{id}/items/{productCode}: set the quantity of one product.
#[tracing::instrument(skip(state, req))]
pub async fn amend(
    State(state): State<Arc<AppState>>,
    Path((id, product_code)): Path<(String, String)>,
    Json(req): Json<AmendQuantityRequest>,
) -> Result<StatusCode, ApiError> {
    let order_id = parse_order_id(&id)?;
    state
        .orchestrator
        .amend(order_id, &ProductCode::new(product_code), req.quantity)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /stats/orders-per-user: order counts per user, largest first.
pub async fn orders_per_user(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<UserOrderCountView>>, ApiError> {
    let counts = state.orchestrator.user_order_stats().await?;
    Ok(Json(counts.into_iter().map(Into::into).collect()))
}

fn parse_order_id(id: &str) -> Result<OrderId, ApiError> {
    let uuid = uuid::Uuid::parse_str(id)
        .map_err(|e| ApiError::BadRequest(format!("Invalid order ID: {e}")))?;
    Ok(OrderId::from_uuid(uuid))
}
