//! Saga error types.

use common::{OrderId, ProductCode};
use domain::OrderError;
use order_store::StoreError;
use thiserror::Error;

/// Errors that can occur during order operations.
#[derive(Debug, Error)]
pub enum SagaError {
    /// The request is malformed. Nothing was changed.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The order does not exist.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// The order has no line for the product.
    #[error("Order {order_id} has no line item for {product_code}")]
    LineItemNotFound {
        order_id: OrderId,
        product_code: ProductCode,
    },

    /// Not enough stock for the listed products.
    #[error("Insufficient stock for: {}", join_codes(.product_codes))]
    InsufficientStock { product_codes: Vec<ProductCode> },

    /// The operation is not valid for the order's current state.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The inventory ledger could not be reached or failed.
    #[error("Inventory dependency failed: {0}")]
    Dependency(String),

    /// Order store failure.
    #[error("Order store error: {0}")]
    Store(StoreError),
}

fn join_codes(codes: &[ProductCode]) -> String {
    codes
        .iter()
        .map(ProductCode::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

impl SagaError {
    /// Maps an aggregate error raised while working on `order_id`.
    pub fn from_order(order_id: OrderId, err: OrderError) -> Self {
        match err {
            OrderError::InvalidStateTransition { .. } => SagaError::Conflict(err.to_string()),
            OrderError::ItemNotFound { product_code } => SagaError::LineItemNotFound {
                order_id,
                product_code: ProductCode::new(product_code),
            },
            other => SagaError::Validation(other.to_string()),
        }
    }

    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            SagaError::Validation(_) => "validation",
            SagaError::OrderNotFound(_) | SagaError::LineItemNotFound { .. } => "not_found",
            SagaError::InsufficientStock { .. } => "insufficient_stock",
            SagaError::Conflict(_) => "conflict",
            SagaError::Dependency(_) => "dependency",
            SagaError::Store(_) => "store",
        }
    }
}

impl From<StoreError> for SagaError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::ConcurrencyConflict { .. } => {
                SagaError::Conflict(format!("order was modified concurrently: {err}"))
            }
            StoreError::OrderNotFound(order_id) => SagaError::OrderNotFound(order_id),
            other => SagaError::Store(other),
        }
    }
}

/// Convenience type alias for saga results.
pub type Result<T> = std::result::Result<T, SagaError>;
