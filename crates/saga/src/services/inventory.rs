//! Inventory client port and in-process implementation.

use std::sync::Arc;

use async_trait::async_trait;
use common::ProductCode;
use inventory::{AdjustOutcome, InventoryError, InventoryLedger, InventoryRecord, StockAdjustment};
use tokio::sync::RwLock;

use crate::error::SagaError;

/// Calls the order side makes against the inventory ledger.
///
/// Transport and ledger failures surface as [`SagaError::Dependency`] so
/// callers can tell "no stock" apart from "could not ask".
#[async_trait]
pub trait InventoryClient: Send + Sync {
    /// Advisory availability check.
    async fn check_available(
        &self,
        product_code: &ProductCode,
        quantity: i64,
    ) -> Result<bool, SagaError>;

    /// Unconditional piece adjustment.
    async fn adjust(
        &self,
        product_code: &ProductCode,
        delta: i64,
    ) -> Result<InventoryRecord, SagaError>;

    /// Conditional piece adjustment that never takes the counter below zero.
    async fn try_adjust(
        &self,
        product_code: &ProductCode,
        delta: i64,
    ) -> Result<AdjustOutcome, SagaError>;

    /// Current quantity, 0 if unknown.
    async fn get_quantity(&self, product_code: &ProductCode) -> Result<i64, SagaError>;
}

#[async_trait]
impl<T: InventoryClient + ?Sized> InventoryClient for Arc<T> {
    async fn check_available(
        &self,
        product_code: &ProductCode,
        quantity: i64,
    ) -> Result<bool, SagaError> {
        (**self).check_available(product_code, quantity).await
    }

    async fn adjust(
        &self,
        product_code: &ProductCode,
        delta: i64,
    ) -> Result<InventoryRecord, SagaError> {
        (**self).adjust(product_code, delta).await
    }

    async fn try_adjust(
        &self,
        product_code: &ProductCode,
        delta: i64,
    ) -> Result<AdjustOutcome, SagaError> {
        (**self).try_adjust(product_code, delta).await
    }

    async fn get_quantity(&self, product_code: &ProductCode) -> Result<i64, SagaError> {
        (**self).get_quantity(product_code).await
    }
}

impl From<InventoryError> for SagaError {
    fn from(err: InventoryError) -> Self {
        match err {
            InventoryError::InvalidAdjustment(_) | InventoryError::Overflow(_) => {
                SagaError::Validation(err.to_string())
            }
            other => SagaError::Dependency(other.to_string()),
        }
    }
}

#[derive(Debug, Default)]
struct FaultState {
    unavailable: bool,
    fail_on_restore: bool,
    refuse_product: Option<ProductCode>,
}

/// Inventory client that calls a ledger in the same process.
///
/// Carries fault switches so tests can simulate an unreachable ledger, a
/// failing restore or a lost race on one product.
#[derive(Debug, Clone)]
pub struct LedgerInventoryClient<L> {
    ledger: L,
    faults: Arc<RwLock<FaultState>>,
}

impl<L: InventoryLedger> LedgerInventoryClient<L> {
    /// Wraps a ledger.
    pub fn new(ledger: L) -> Self {
        Self {
            ledger,
            faults: Arc::default(),
        }
    }

    /// Gets a reference to the wrapped ledger.
    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Makes every call fail as if the ledger were unreachable.
    pub async fn set_unavailable(&self, unavailable: bool) {
        self.faults.write().await.unavailable = unavailable;
    }

    /// Makes positive unconditional adjustments fail.
    pub async fn set_fail_on_restore(&self, fail: bool) {
        self.faults.write().await.fail_on_restore = fail;
    }

    /// Makes conditional decrements of one product be refused regardless of
    /// stock, as if a concurrent order had taken it first.
    pub async fn set_refuse_product(&self, product_code: Option<ProductCode>) {
        self.faults.write().await.refuse_product = product_code;
    }

    async fn ensure_available(&self) -> Result<(), SagaError> {
        if self.faults.read().await.unavailable {
            return Err(SagaError::Dependency(
                "inventory ledger unavailable".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl<L: InventoryLedger> InventoryClient for LedgerInventoryClient<L> {
    async fn check_available(
        &self,
        product_code: &ProductCode,
        quantity: i64,
    ) -> Result<bool, SagaError> {
        self.ensure_available().await?;
        Ok(self.ledger.check_available(product_code, quantity).await?)
    }

    async fn adjust(
        &self,
        product_code: &ProductCode,
        delta: i64,
    ) -> Result<InventoryRecord, SagaError> {
        self.ensure_available().await?;
        if delta > 0 && self.faults.read().await.fail_on_restore {
            return Err(SagaError::Dependency(format!(
                "restore of {product_code} failed"
            )));
        }
        Ok(self
            .ledger
            .adjust(StockAdjustment::pieces(product_code.clone(), delta))
            .await?)
    }

    async fn try_adjust(
        &self,
        product_code: &ProductCode,
        delta: i64,
    ) -> Result<AdjustOutcome, SagaError> {
        self.ensure_available().await?;
        if delta < 0 && self.faults.read().await.refuse_product.as_ref() == Some(product_code) {
            let available = self.ledger.get_quantity(product_code).await?;
            return Ok(AdjustOutcome::Insufficient { available });
        }
        Ok(self.ledger.try_adjust(product_code, delta).await?)
    }

    async fn get_quantity(&self, product_code: &ProductCode) -> Result<i64, SagaError> {
        self.ensure_available().await?;
        Ok(self.ledger.get_quantity(product_code).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inventory::InMemoryInventoryLedger;

    fn client() -> LedgerInventoryClient<InMemoryInventoryLedger> {
        LedgerInventoryClient::new(InMemoryInventoryLedger::with_stock([("WIDGET", 5)]))
    }

    #[tokio::test]
    async fn test_passes_calls_through() {
        let client = client();
        let widget = ProductCode::new("WIDGET");

        assert!(client.check_available(&widget, 5).await.unwrap());
        assert!(client.try_adjust(&widget, -2).await.unwrap().is_applied());
        assert_eq!(client.adjust(&widget, 1).await.unwrap().quantity, 4);
        assert_eq!(client.get_quantity(&widget).await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_unavailable_ledger_is_a_dependency_error() {
        let client = client();
        client.set_unavailable(true).await;

        let result = client.check_available(&ProductCode::new("WIDGET"), 1).await;
        assert!(matches!(result, Err(SagaError::Dependency(_))));
    }

    #[tokio::test]
    async fn test_refused_product_leaves_stock_alone() {
        let client = client();
        let widget = ProductCode::new("WIDGET");
        client.set_refuse_product(Some(widget.clone())).await;

        let outcome = client.try_adjust(&widget, -1).await.unwrap();
        assert_eq!(outcome, AdjustOutcome::Insufficient { available: 5 });
        assert_eq!(client.ledger().get_quantity(&widget).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_failing_restore_only_blocks_increments() {
        let client = client();
        let widget = ProductCode::new("WIDGET");
        client.set_fail_on_restore(true).await;

        assert!(client.adjust(&widget, 1).await.is_err());
        assert_eq!(client.adjust(&widget, -1).await.unwrap().quantity, 4);
    }
}
