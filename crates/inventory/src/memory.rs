use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};

use crate::{
    AdjustOutcome, InventoryError, InventoryRecord, ProductCode, Result, StockAdjustment,
    ledger::InventoryLedger,
};

type Counter = Arc<Mutex<i64>>;

/// In-memory inventory ledger.
///
/// Each product code owns its own lock, so adjustments of different codes
/// never wait on each other while adjustments of one code are serialized.
#[derive(Debug, Clone, Default)]
pub struct InMemoryInventoryLedger {
    counters: Arc<RwLock<HashMap<ProductCode, Counter>>>,
}

impl InMemoryInventoryLedger {
    /// Creates a new empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a ledger holding the given quantities.
    pub fn with_stock<I, C>(stock: I) -> Self
    where
        I: IntoIterator<Item = (C, i64)>,
        C: Into<ProductCode>,
    {
        let counters = stock
            .into_iter()
            .map(|(code, quantity)| (code.into(), Arc::new(Mutex::new(quantity))))
            .collect();
        Self {
            counters: Arc::new(RwLock::new(counters)),
        }
    }

    async fn existing(&self, product_code: &ProductCode) -> Option<Counter> {
        self.counters.read().await.get(product_code).cloned()
    }

    async fn counter(&self, product_code: &ProductCode) -> Counter {
        if let Some(counter) = self.existing(product_code).await {
            return counter;
        }
        self.counters
            .write()
            .await
            .entry(product_code.clone())
            .or_default()
            .clone()
    }
}

#[async_trait]
impl InventoryLedger for InMemoryInventoryLedger {
    async fn check_available(&self, product_code: &ProductCode, quantity: i64) -> Result<bool> {
        match self.existing(product_code).await {
            Some(counter) => Ok(*counter.lock().await >= quantity),
            None => Ok(false),
        }
    }

    #[tracing::instrument(skip(self), fields(product_code = %adjustment.product_code))]
    async fn adjust(&self, adjustment: StockAdjustment) -> Result<InventoryRecord> {
        let delta = adjustment.delta_in_pieces()?;
        let counter = self.counter(&adjustment.product_code).await;
        let mut quantity = counter.lock().await;

        *quantity = quantity
            .checked_add(delta)
            .ok_or_else(|| InventoryError::Overflow(adjustment.product_code.clone()))?;

        metrics::counter!("inventory_adjustments_total", "kind" => "unconditional").increment(1);
        tracing::debug!(delta, quantity = *quantity, "Stock adjusted");

        Ok(InventoryRecord::new(adjustment.product_code, *quantity))
    }

    #[tracing::instrument(skip(self))]
    async fn try_adjust(&self, product_code: &ProductCode, delta: i64) -> Result<AdjustOutcome> {
        let counter = if delta >= 0 {
            self.counter(product_code).await
        } else {
            match self.existing(product_code).await {
                Some(counter) => counter,
                None => {
                    metrics::counter!("inventory_adjustments_total", "kind" => "refused")
                        .increment(1);
                    return Ok(AdjustOutcome::Insufficient { available: 0 });
                }
            }
        };

        let mut quantity = counter.lock().await;
        let next = quantity
            .checked_add(delta)
            .ok_or_else(|| InventoryError::Overflow(product_code.clone()))?;

        if next < 0 {
            metrics::counter!("inventory_adjustments_total", "kind" => "refused").increment(1);
            tracing::debug!(available = *quantity, "Conditional adjustment refused");
            return Ok(AdjustOutcome::Insufficient {
                available: *quantity,
            });
        }

        *quantity = next;
        metrics::counter!("inventory_adjustments_total", "kind" => "conditional").increment(1);

        Ok(AdjustOutcome::Applied(InventoryRecord::new(
            product_code.clone(),
            next,
        )))
    }

    async fn get_quantity(&self, product_code: &ProductCode) -> Result<i64> {
        match self.existing(product_code).await {
            Some(counter) => Ok(*counter.lock().await),
            None => Ok(0),
        }
    }

    async fn list(&self) -> Result<Vec<InventoryRecord>> {
        let counters = self.counters.read().await;
        let mut records = Vec::with_capacity(counters.len());
        for (code, counter) in counters.iter() {
            records.push(InventoryRecord::new(code.clone(), *counter.lock().await));
        }
        records.sort_by(|a, b| a.product_code.cmp(&b.product_code));
        Ok(records)
    }
}
