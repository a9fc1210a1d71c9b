//! Stock adjustment coordinator for placement, cancellation and amendment.

use std::time::Instant;

use common::{OrderId, ProductCode};
use domain::{Money, Order, OrderLineItem, OrderNumber, OrderStatus};
use inventory::AdjustOutcome;
use order_store::OrderStore;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SagaError};
use crate::order_fulfillment;
use crate::services::inventory::InventoryClient;

/// One requested line of a new order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineRequest {
    pub product_code: ProductCode,
    pub quantity: i64,
    #[serde(rename = "priceCents")]
    pub price: Money,
}

impl OrderLineRequest {
    /// Creates a line request.
    pub fn new(product_code: impl Into<ProductCode>, quantity: i64, price: Money) -> Self {
        Self {
            product_code: product_code.into(),
            quantity,
            price,
        }
    }
}

/// Command to place an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrder {
    pub username: String,
    pub line_items: Vec<OrderLineRequest>,
}

impl PlaceOrder {
    /// Creates a placement command.
    pub fn new(username: impl Into<String>, line_items: Vec<OrderLineRequest>) -> Self {
        Self {
            username: username.into(),
            line_items,
        }
    }

    fn into_order(self) -> Result<Order> {
        let line_items = self
            .line_items
            .into_iter()
            .map(|line| {
                if line.quantity <= 0 {
                    return Err(SagaError::Validation(format!(
                        "quantity for {} must be greater than 0, got {}",
                        line.product_code, line.quantity
                    )));
                }
                let quantity = u32::try_from(line.quantity).map_err(|_| {
                    SagaError::Validation(format!(
                        "quantity for {} is too large: {}",
                        line.product_code, line.quantity
                    ))
                })?;
                Ok(OrderLineItem::new(line.product_code, quantity, line.price))
            })
            .collect::<Result<Vec<_>>>()?;

        Order::place(self.username, line_items).map_err(|e| SagaError::Validation(e.to_string()))
    }
}

/// Confirmation for a placed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacedOrder {
    pub order_id: OrderId,
    pub order_number: OrderNumber,
    pub message: String,
}

/// Keeps orders and the inventory ledger in agreement.
///
/// The coordinator never holds a lock across the order store and the
/// ledger. Safety against oversell comes from the ledger's conditional
/// decrement, and safety against double restores comes from the store's
/// version check.
#[derive(Debug, Clone)]
pub struct StockAdjustmentCoordinator<S, I>
where
    S: OrderStore,
    I: InventoryClient,
{
    store: S,
    inventory: I,
}

impl<S, I> StockAdjustmentCoordinator<S, I>
where
    S: OrderStore,
    I: InventoryClient,
{
    /// Creates a new coordinator.
    pub fn new(store: S, inventory: I) -> Self {
        Self { store, inventory }
    }

    /// Gets a reference to the order store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Gets a reference to the inventory client.
    pub fn inventory(&self) -> &I {
        &self.inventory
    }

    /// Places an order and reserves its stock.
    ///
    /// On any failure the order is not stored and the ledger is left as it
    /// was, apart from compensations that themselves failed (logged).
    #[tracing::instrument(skip(self, command), fields(username = %command.username))]
    pub async fn place(&self, command: PlaceOrder) -> Result<PlacedOrder> {
        let start = Instant::now();
        let result = self.try_place(command).await;
        self.finish(order_fulfillment::OPERATION_PLACE, start, &result);

        match &result {
            Ok(placed) => {
                metrics::counter!("orders_placed_total").increment(1);
                tracing::info!(
                    order_id = %placed.order_id,
                    order_number = %placed.order_number,
                    "Order placed"
                );
            }
            Err(e) => {
                metrics::counter!("orders_rejected_total", "reason" => e.kind()).increment(1);
                tracing::info!(error = %e, "Order rejected");
            }
        }
        result
    }

    async fn try_place(&self, command: PlaceOrder) -> Result<PlacedOrder> {
        let order = command.into_order()?;
        let wanted = order.reserved_quantities();

        let mut unsatisfied = Vec::new();
        for (product_code, quantity) in &wanted {
            if !self
                .inventory
                .check_available(product_code, to_delta(*quantity)?)
                .await?
            {
                unsatisfied.push(product_code.clone());
            }
        }
        if !unsatisfied.is_empty() {
            return Err(SagaError::InsufficientStock {
                product_codes: unsatisfied,
            });
        }

        let mut applied: Vec<(ProductCode, i64)> = Vec::with_capacity(wanted.len());
        for (product_code, quantity) in wanted {
            let delta = -to_delta(quantity)?;
            match self.inventory.try_adjust(&product_code, delta).await {
                Ok(AdjustOutcome::Applied(_)) => applied.push((product_code, delta)),
                Ok(AdjustOutcome::Insufficient { available }) => {
                    tracing::info!(%product_code, available, "Stock taken by a concurrent order");
                    self.compensate(&applied).await;
                    return Err(SagaError::InsufficientStock {
                        product_codes: vec![product_code],
                    });
                }
                Err(e) => {
                    self.compensate(&applied).await;
                    return Err(e);
                }
            }
        }

        if let Err(e) = self.store.insert(&order).await {
            tracing::error!(error = %e, order_id = %order.id(), "Persisting placed order failed");
            self.compensate(&applied).await;
            return Err(e.into());
        }

        Ok(PlacedOrder {
            order_id: order.id(),
            order_number: order.order_number().clone(),
            message: order_fulfillment::PLACED_MESSAGE.to_string(),
        })
    }

    /// Cancels an order and restores its stock.
    ///
    /// The cancelled order is persisted before any restore, so a concurrent
    /// second cancel loses the version race and restores nothing. If a
    /// restore fails the order stays cancelled and the failure is reported
    /// as a dependency error.
    #[tracing::instrument(skip(self))]
    pub async fn cancel(&self, order_id: OrderId) -> Result<()> {
        let start = Instant::now();
        let result = self.try_cancel(order_id).await;
        self.finish(order_fulfillment::OPERATION_CANCEL, start, &result);

        if result.is_ok() {
            metrics::counter!("orders_cancelled_total").increment(1);
            tracing::info!(%order_id, "Order cancelled");
        }
        result
    }

    async fn try_cancel(&self, order_id: OrderId) -> Result<()> {
        let mut order = self.load(order_id).await?;
        if order.status() == OrderStatus::Cancelled {
            return Err(SagaError::Conflict(format!(
                "order {order_id} is already cancelled"
            )));
        }

        let held = order.reserved_quantities();
        order
            .cancel()
            .map_err(|e| SagaError::from_order(order_id, e))?;
        self.store.update(&order).await?;

        let mut failed = Vec::new();
        for (product_code, quantity) in held {
            let restored = match to_delta(quantity) {
                Ok(delta) => self.inventory.adjust(&product_code, delta).await.map(|_| ()),
                Err(e) => Err(e),
            };
            if let Err(e) = restored {
                tracing::error!(
                    %order_id,
                    %product_code,
                    quantity,
                    error = %e,
                    "Stock restore failed, manual reconciliation required"
                );
                failed.push(product_code.to_string());
            }
        }

        if !failed.is_empty() {
            return Err(SagaError::Dependency(format!(
                "order {order_id} cancelled but stock restore failed for: {}",
                failed.join(", ")
            )));
        }
        Ok(())
    }

    /// Changes the quantity of one product in a pending order.
    ///
    /// A quantity of 0 removes the product's lines, and an order left with
    /// no lines is cancelled.
    #[tracing::instrument(skip(self))]
    pub async fn amend(
        &self,
        order_id: OrderId,
        product_code: &ProductCode,
        new_quantity: i64,
    ) -> Result<()> {
        let start = Instant::now();
        let result = self.try_amend(order_id, product_code, new_quantity).await;
        self.finish(order_fulfillment::OPERATION_AMEND, start, &result);

        if result.is_ok() {
            metrics::counter!("orders_amended_total").increment(1);
        }
        result
    }

    async fn try_amend(
        &self,
        order_id: OrderId,
        product_code: &ProductCode,
        new_quantity: i64,
    ) -> Result<()> {
        if new_quantity < 0 {
            return Err(SagaError::Validation(format!(
                "quantity must not be negative, got {new_quantity}"
            )));
        }
        let new_quantity = u32::try_from(new_quantity).map_err(|_| {
            SagaError::Validation(format!("quantity is too large: {new_quantity}"))
        })?;

        let mut order = self.load(order_id).await?;
        let change = order
            .quantity_change(product_code, new_quantity)
            .map_err(|e| SagaError::from_order(order_id, e))?;
        if change.is_noop() {
            tracing::debug!(%order_id, %product_code, "Quantity unchanged");
            return Ok(());
        }

        // The ledger moves opposite to the order quantity.
        let ledger_delta = -change.delta();
        if ledger_delta < 0 {
            match self.inventory.try_adjust(product_code, ledger_delta).await? {
                AdjustOutcome::Applied(_) => {}
                AdjustOutcome::Insufficient { available } => {
                    tracing::info!(%order_id, %product_code, available, "Amendment refused");
                    return Err(SagaError::InsufficientStock {
                        product_codes: vec![product_code.clone()],
                    });
                }
            }

            if let Err(e) = self
                .persist_amendment(&mut order, product_code, new_quantity)
                .await
            {
                tracing::warn!(%order_id, error = %e, "Persisting amendment failed");
                self.compensate(&[(product_code.clone(), ledger_delta)])
                    .await;
                return Err(e);
            }
        } else {
            // Units return to the ledger only once the smaller quantity is stored.
            self.persist_amendment(&mut order, product_code, new_quantity)
                .await?;

            if let Err(e) = self.inventory.adjust(product_code, ledger_delta).await {
                tracing::error!(
                    %order_id,
                    %product_code,
                    quantity = ledger_delta,
                    error = %e,
                    "Stock restore failed, manual reconciliation required"
                );
                return Err(SagaError::Dependency(format!(
                    "order {order_id} amended but stock restore failed for {product_code}: {e}"
                )));
            }
        }

        tracing::info!(
            %order_id,
            %product_code,
            old_quantity = change.old_quantity,
            new_quantity,
            status = %order.status(),
            "Order amended"
        );
        Ok(())
    }

    async fn persist_amendment(
        &self,
        order: &mut Order,
        product_code: &ProductCode,
        new_quantity: u32,
    ) -> Result<()> {
        let order_id = order.id();
        order
            .set_quantity(product_code, new_quantity)
            .map_err(|e| SagaError::from_order(order_id, e))?;
        self.store.update(order).await?;
        Ok(())
    }

    async fn load(&self, order_id: OrderId) -> Result<Order> {
        self.store
            .get(order_id)
            .await?
            .ok_or(SagaError::OrderNotFound(order_id))
    }

    /// Reverts ledger deltas that were applied for a step that did not complete.
    ///
    /// Every delta is attempted; failures are logged since the caller is
    /// already returning an error of its own.
    async fn compensate(&self, applied: &[(ProductCode, i64)]) {
        for (product_code, delta) in applied.iter().rev() {
            metrics::counter!("stock_compensations_total").increment(1);
            match self.inventory.adjust(product_code, -delta).await {
                Ok(record) => {
                    tracing::info!(
                        %product_code,
                        delta = -delta,
                        quantity = record.quantity,
                        "Stock compensated"
                    );
                }
                Err(e) => {
                    tracing::error!(
                        %product_code,
                        delta = -delta,
                        error = %e,
                        "Compensation failed, manual reconciliation required"
                    );
                }
            }
        }
    }

    fn finish<T>(&self, operation: &'static str, start: Instant, result: &Result<T>) {
        metrics::histogram!("saga_duration_seconds", "operation" => operation)
            .record(start.elapsed().as_secs_f64());
        if let Err(e) = result {
            tracing::debug!(operation, error = %e, kind = e.kind(), "Operation failed");
        }
    }
}

fn to_delta(quantity: u64) -> Result<i64> {
    i64::try_from(quantity)
        .map_err(|_| SagaError::Validation(format!("quantity is too large: {quantity}")))
}
