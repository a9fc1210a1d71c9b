//! Order aggregate and related types.

mod aggregate;
mod state;
mod value_objects;

pub use aggregate::{Order, QuantityChange, aggregate_quantities};
pub use state::OrderStatus;
pub use value_objects::{Money, OrderLineItem, OrderNumber};

use thiserror::Error;

/// Errors that can occur during order operations.
#[derive(Debug, Error)]
pub enum OrderError {
    /// Username is required.
    #[error("Username is required")]
    UsernameRequired,

    /// Product code is required on every line.
    #[error("Product code is required")]
    ProductCodeRequired,

    /// Order is not in the expected state.
    #[error("Invalid state transition: cannot {action} from {current_state} state")]
    InvalidStateTransition {
        current_state: OrderStatus,
        action: &'static str,
    },

    /// No line for the product in the order.
    #[error("Item not found: {product_code}")]
    ItemNotFound { product_code: String },

    /// Invalid quantity.
    #[error("Invalid quantity for {product_code}: {quantity} (must be greater than 0)")]
    InvalidQuantity { product_code: String, quantity: u32 },

    /// Invalid price.
    #[error("Invalid price for {product_code}: {price} cents (must not be negative)")]
    InvalidPrice { product_code: String, price: i64 },

    /// Line or order total does not fit in the money range.
    #[error("Order total overflows at {product_code}")]
    AmountOverflow { product_code: String },

    /// Order has no line items.
    #[error("Order has no line items")]
    NoLineItems,

    /// Stored status string is not recognised.
    #[error("Unknown order status: {0}")]
    UnknownStatus(String),
}
