//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use inventory::InventoryError;
use order_store::StoreError;
use saga::SagaError;
use thiserror::Error;

/// API-level error type that maps to HTTP responses.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Bad request from the client.
    #[error("{0}")]
    BadRequest(String),
    /// Order operation failure.
    #[error(transparent)]
    Saga(#[from] SagaError),
    /// Inventory ledger failure.
    #[error(transparent)]
    Inventory(#[from] InventoryError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Saga(err) => saga_error_to_response(err),
            ApiError::Inventory(err) => inventory_error_to_response(err),
        };

        if status.is_server_error() {
            tracing::error!(%status, error = %message, "request failed");
        }

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn saga_error_to_response(err: SagaError) -> (StatusCode, String) {
    let status = match &err {
        SagaError::Validation(_) => StatusCode::BAD_REQUEST,
        SagaError::OrderNotFound(_) | SagaError::LineItemNotFound { .. } => StatusCode::NOT_FOUND,
        SagaError::InsufficientStock { .. } | SagaError::Conflict(_) => StatusCode::CONFLICT,
        SagaError::Dependency(_) => StatusCode::SERVICE_UNAVAILABLE,
        SagaError::Store(StoreError::Unavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
        SagaError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, err.to_string())
}

fn inventory_error_to_response(err: InventoryError) -> (StatusCode, String) {
    let status = match &err {
        InventoryError::InvalidAdjustment(_) | InventoryError::Overflow(_) => {
            StatusCode::BAD_REQUEST
        }
        InventoryError::Database(_) | InventoryError::Migration(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, err.to_string())
}

/// Errors raised while wiring the services at startup.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Database connection failed: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Order store setup failed: {0}")]
    OrderStore(#[from] StoreError),

    #[error("Inventory setup failed: {0}")]
    Inventory(#[from] InventoryError),

    #[error("Inventory client setup failed: {0}")]
    InventoryClient(#[from] SagaError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{OrderId, ProductCode};

    fn status_of(err: impl Into<ApiError>) -> StatusCode {
        err.into().into_response().status()
    }

    #[test]
    fn test_taxonomy_status_codes() {
        assert_eq!(
            status_of(SagaError::Validation("bad".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(SagaError::OrderNotFound(OrderId::new())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(SagaError::InsufficientStock {
                product_codes: vec![ProductCode::new("WIDGET")]
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(SagaError::Conflict("cancelled".into())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(SagaError::Dependency("timeout".into())),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_inventory_status_codes() {
        assert_eq!(
            status_of(InventoryError::InvalidAdjustment("bad".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(ApiError::BadRequest("nope".into())),
            StatusCode::BAD_REQUEST
        );
    }
}
