use std::sync::Arc;

use async_trait::async_trait;

use crate::{AdjustOutcome, InventoryRecord, ProductCode, Result, StockAdjustment};

/// Core trait for inventory ledger implementations.
///
/// Every operation on a single product code is linearizable: concurrent
/// adjustments of the same code never lose an update.
#[async_trait]
pub trait InventoryLedger: Send + Sync {
    /// Returns true iff the product is known and its quantity is at least
    /// `quantity`. Unknown products are never available.
    async fn check_available(&self, product_code: &ProductCode, quantity: i64) -> Result<bool>;

    /// Applies a delta unconditionally, creating the record if needed.
    ///
    /// The resulting quantity may be negative.
    async fn adjust(&self, adjustment: StockAdjustment) -> Result<InventoryRecord>;

    /// Applies a piece delta only if the resulting quantity stays at or above
    /// zero. The check and the write are one atomic step.
    ///
    /// An unknown product with a non-negative delta is created; with a
    /// negative delta it is refused with `available: 0`.
    async fn try_adjust(&self, product_code: &ProductCode, delta: i64) -> Result<AdjustOutcome>;

    /// Current quantity, or 0 if the product is unknown.
    async fn get_quantity(&self, product_code: &ProductCode) -> Result<i64>;

    /// All records, sorted by product code.
    async fn list(&self) -> Result<Vec<InventoryRecord>>;
}

#[async_trait]
impl<T: InventoryLedger + ?Sized> InventoryLedger for Arc<T> {
    async fn check_available(&self, product_code: &ProductCode, quantity: i64) -> Result<bool> {
        (**self).check_available(product_code, quantity).await
    }

    async fn adjust(&self, adjustment: StockAdjustment) -> Result<InventoryRecord> {
        (**self).adjust(adjustment).await
    }

    async fn try_adjust(&self, product_code: &ProductCode, delta: i64) -> Result<AdjustOutcome> {
        (**self).try_adjust(product_code, delta).await
    }

    async fn get_quantity(&self, product_code: &ProductCode) -> Result<i64> {
        (**self).get_quantity(product_code).await
    }

    async fn list(&self) -> Result<Vec<InventoryRecord>> {
        (**self).list().await
    }
}
