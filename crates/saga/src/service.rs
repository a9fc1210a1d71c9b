//! Order orchestrator: the public order operations.

use common::{OrderId, ProductCode};
use domain::Order;
use order_store::{OrderStore, UserOrderCount};

use crate::coordinator::{PlaceOrder, PlacedOrder, StockAdjustmentCoordinator};
use crate::error::{Result, SagaError};
use crate::services::inventory::InventoryClient;

/// Public order operations on top of the stock adjustment protocol.
#[derive(Debug, Clone)]
pub struct OrderOrchestrator<S, I>
where
    S: OrderStore,
    I: InventoryClient,
{
    coordinator: StockAdjustmentCoordinator<S, I>,
}

impl<S, I> OrderOrchestrator<S, I>
where
    S: OrderStore,
    I: InventoryClient,
{
    /// Creates a new orchestrator.
    pub fn new(store: S, inventory: I) -> Self {
        Self {
            coordinator: StockAdjustmentCoordinator::new(store, inventory),
        }
    }

    /// Gets a reference to the underlying coordinator.
    pub fn coordinator(&self) -> &StockAdjustmentCoordinator<S, I> {
        &self.coordinator
    }

    fn store(&self) -> &S {
        self.coordinator.store()
    }

    /// Places an order, reserving its stock.
    pub async fn place(&self, command: PlaceOrder) -> Result<PlacedOrder> {
        self.coordinator.place(command).await
    }

    /// Lists every order in placement order.
    pub async fn list(&self) -> Result<Vec<Order>> {
        Ok(self.store().list().await?)
    }

    /// Lists the orders of one user in placement order.
    pub async fn list_by_username(&self, username: &str) -> Result<Vec<Order>> {
        Ok(self.store().list_by_username(username).await?)
    }

    /// Loads one order.
    pub async fn get(&self, order_id: OrderId) -> Result<Order> {
        self.store()
            .get(order_id)
            .await?
            .ok_or(SagaError::OrderNotFound(order_id))
    }

    /// Moves a pending order to validated. Stock is not touched.
    #[tracing::instrument(skip(self))]
    pub async fn validate(&self, order_id: OrderId) -> Result<()> {
        let mut order = self.get(order_id).await?;
        order
            .validate()
            .map_err(|e| SagaError::from_order(order_id, e))?;
        self.store().update(&order).await?;

        tracing::info!(%order_id, "Order validated");
        Ok(())
    }

    /// Cancels an order and restores its stock.
    pub async fn cancel(&self, order_id: OrderId) -> Result<()> {
        self.coordinator.cancel(order_id).await
    }

    /// Sets the quantity of one product in a pending order.
    pub async fn amend(
        &self,
        order_id: OrderId,
        product_code: &ProductCode,
        new_quantity: i64,
    ) -> Result<()> {
        self.coordinator
            .amend(order_id, product_code, new_quantity)
            .await
    }

    /// Order counts per user, largest first.
    ///
    /// Users with equal counts keep the order in which they first ordered.
    pub async fn user_order_stats(&self) -> Result<Vec<UserOrderCount>> {
        let mut counts = self.store().count_by_username().await?;
        counts.sort_by(|a, b| b.order_count.cmp(&a.order_count));
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::{Money, OrderStatus};
    use inventory::InMemoryInventoryLedger;
    use order_store::InMemoryOrderStore;

    use crate::coordinator::OrderLineRequest;
    use crate::services::inventory::LedgerInventoryClient;

    fn orchestrator()
    -> OrderOrchestrator<InMemoryOrderStore, LedgerInventoryClient<InMemoryInventoryLedger>> {
        OrderOrchestrator::new(
            InMemoryOrderStore::new(),
            LedgerInventoryClient::new(InMemoryInventoryLedger::with_stock([("WIDGET", 100)])),
        )
    }

    fn widgets(username: &str, quantity: i64) -> PlaceOrder {
        PlaceOrder::new(
            username,
            vec![OrderLineRequest::new(
                "WIDGET",
                quantity,
                Money::from_cents(250),
            )],
        )
    }

    #[tokio::test]
    async fn test_validate_pending_order() {
        let orchestrator = orchestrator();
        let placed = orchestrator.place(widgets("alice", 1)).await.unwrap();

        orchestrator.validate(placed.order_id).await.unwrap();
        let order = orchestrator.get(placed.order_id).await.unwrap();
        assert_eq!(order.status(), OrderStatus::Validated);

        let again = orchestrator.validate(placed.order_id).await;
        assert!(matches!(again, Err(SagaError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_validate_cancelled_order_is_a_conflict() {
        let orchestrator = orchestrator();
        let placed = orchestrator.place(widgets("alice", 1)).await.unwrap();
        orchestrator.cancel(placed.order_id).await.unwrap();

        let result = orchestrator.validate(placed.order_id).await;
        assert!(matches!(result, Err(SagaError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_validated_order_can_still_be_cancelled() {
        let orchestrator = orchestrator();
        let placed = orchestrator.place(widgets("alice", 4)).await.unwrap();
        orchestrator.validate(placed.order_id).await.unwrap();

        orchestrator.cancel(placed.order_id).await.unwrap();
        let quantity = orchestrator
            .coordinator()
            .inventory()
            .get_quantity(&ProductCode::new("WIDGET"))
            .await
            .unwrap();
        assert_eq!(quantity, 100);
    }

    #[tokio::test]
    async fn test_get_and_validate_unknown_order() {
        let orchestrator = orchestrator();
        assert!(matches!(
            orchestrator.get(OrderId::new()).await,
            Err(SagaError::OrderNotFound(_))
        ));
        assert!(matches!(
            orchestrator.validate(OrderId::new()).await,
            Err(SagaError::OrderNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_lists_by_username() {
        let orchestrator = orchestrator();
        for username in ["alice", "bob", "alice"] {
            orchestrator.place(widgets(username, 1)).await.unwrap();
        }

        assert_eq!(orchestrator.list().await.unwrap().len(), 3);
        let alice = orchestrator.list_by_username("alice").await.unwrap();
        assert_eq!(alice.len(), 2);
        assert!(alice.iter().all(|o| o.username() == "alice"));
        assert!(orchestrator.list_by_username("nobody").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_user_order_stats_sorted_descending() {
        let orchestrator = orchestrator();
        for username in ["carol", "alice", "bob", "alice", "bob", "alice"] {
            orchestrator.place(widgets(username, 1)).await.unwrap();
        }

        let stats: Vec<_> = orchestrator
            .user_order_stats()
            .await
            .unwrap()
            .into_iter()
            .map(|c| (c.username, c.order_count))
            .collect();
        assert_eq!(
            stats,
            vec![
                ("alice".to_string(), 3),
                ("bob".to_string(), 2),
                ("carol".to_string(), 1),
            ]
        );
    }
}
