//! Health check endpoints.

use axum::Json;
use serde::Serialize;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
}

/// GET /health on the order service.
pub async fn order_service() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: "order-service",
    })
}

/// GET /health on the inventory service.
pub async fn inventory_service() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: "inventory-service",
    })
}
