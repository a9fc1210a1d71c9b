use thiserror::Error;

use crate::ProductCode;

/// Errors that can occur when interacting with the inventory ledger.
#[derive(Debug, Error)]
pub enum InventoryError {
    /// The adjustment request is malformed.
    #[error("Invalid adjustment: {0}")]
    InvalidAdjustment(String),

    /// Applying the delta would overflow the counter.
    #[error("Quantity overflow for product {0}")]
    Overflow(ProductCode),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, InventoryError>;
