use std::sync::Arc;

use async_trait::async_trait;
use domain::Order;
use tokio::sync::RwLock;

use crate::{
    OrderId, Result, StoreError, Version,
    store::{OrderStore, UserOrderCount},
};

#[derive(Debug, Default)]
struct InMemoryOrderState {
    orders: Vec<Order>,
    fail_on_write: bool,
}

/// In-memory order store implementation.
///
/// Keeps orders in insertion order and provides the same interface as the
/// PostgreSQL implementation.
#[derive(Debug, Clone, Default)]
pub struct InMemoryOrderStore {
    state: Arc<RwLock<InMemoryOrderState>>,
}

impl InMemoryOrderStore {
    /// Creates a new empty in-memory order store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of orders stored.
    pub async fn order_count(&self) -> usize {
        self.state.read().await.orders.len()
    }

    /// Makes every subsequent insert/update fail with `Unavailable`.
    pub async fn set_fail_on_write(&self, fail: bool) {
        self.state.write().await.fail_on_write = fail;
    }

    /// Removes all orders.
    pub async fn clear(&self) {
        self.state.write().await.orders.clear();
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn insert(&self, order: &Order) -> Result<Version> {
        let mut state = self.state.write().await;
        if state.fail_on_write {
            return Err(StoreError::Unavailable("writes disabled".to_string()));
        }

        if state.orders.iter().any(|o| o.id() == order.id()) {
            return Err(StoreError::DuplicateOrder(order.id()));
        }

        if order.version() != Version::initial() {
            return Err(StoreError::ConcurrencyConflict {
                order_id: order.id(),
                expected: order.version(),
                actual: Version::initial(),
            });
        }

        let mut stored = order.clone();
        stored.set_version(Version::first());
        state.orders.push(stored);
        Ok(Version::first())
    }

    async fn get(&self, order_id: OrderId) -> Result<Option<Order>> {
        let state = self.state.read().await;
        Ok(state.orders.iter().find(|o| o.id() == order_id).cloned())
    }

    async fn update(&self, order: &Order) -> Result<Version> {
        let mut state = self.state.write().await;
        if state.fail_on_write {
            return Err(StoreError::Unavailable("writes disabled".to_string()));
        }

        let stored = state
            .orders
            .iter_mut()
            .find(|o| o.id() == order.id())
            .ok_or(StoreError::OrderNotFound(order.id()))?;

        if stored.version() != order.version() {
            return Err(StoreError::ConcurrencyConflict {
                order_id: order.id(),
                expected: order.version(),
                actual: stored.version(),
            });
        }

        let next = order.version().next();
        *stored = order.clone();
        stored.set_version(next);
        Ok(next)
    }

    async fn list(&self) -> Result<Vec<Order>> {
        Ok(self.state.read().await.orders.clone())
    }

    async fn list_by_username(&self, username: &str) -> Result<Vec<Order>> {
        let state = self.state.read().await;
        Ok(state
            .orders
            .iter()
            .filter(|o| o.username() == username)
            .cloned()
            .collect())
    }

    async fn count_by_username(&self) -> Result<Vec<UserOrderCount>> {
        let state = self.state.read().await;
        let mut counts: Vec<UserOrderCount> = Vec::new();
        for order in &state.orders {
            match counts.iter_mut().find(|c| c.username == order.username()) {
                Some(count) => count.order_count += 1,
                None => counts.push(UserOrderCount {
                    username: order.username().to_string(),
                    order_count: 1,
                }),
            }
        }
        Ok(counts)
    }
}
