use std::sync::Arc;

use async_trait::async_trait;
use domain::Order;

use crate::{OrderId, Result, Version};

/// Number of orders placed by one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserOrderCount {
    pub username: String,
    pub order_count: u64,
}

/// Core trait for order store implementations.
///
/// All implementations must be thread-safe (Send + Sync). Listing methods
/// return orders in insertion order.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Stores a new order.
    ///
    /// The order must be at `Version::initial()`. Returns the stored version.
    async fn insert(&self, order: &Order) -> Result<Version>;

    /// Loads an order by id. Returns None if it does not exist.
    async fn get(&self, order_id: OrderId) -> Result<Option<Order>>;

    /// Replaces a stored order.
    ///
    /// `order.version()` must equal the stored version, otherwise the call
    /// fails with `ConcurrencyConflict` and nothing is written. Returns the
    /// new version.
    async fn update(&self, order: &Order) -> Result<Version>;

    /// Lists every order.
    async fn list(&self) -> Result<Vec<Order>>;

    /// Lists the orders owned by `username`.
    async fn list_by_username(&self, username: &str) -> Result<Vec<Order>>;

    /// Counts orders per username, in order of each user's first order.
    async fn count_by_username(&self) -> Result<Vec<UserOrderCount>>;
}

#[async_trait]
impl<T: OrderStore + ?Sized> OrderStore for Arc<T> {
    async fn insert(&self, order: &Order) -> Result<Version> {
        (**self).insert(order).await
    }

    async fn get(&self, order_id: OrderId) -> Result<Option<Order>> {
        (**self).get(order_id).await
    }

    async fn update(&self, order: &Order) -> Result<Version> {
        (**self).update(order).await
    }

    async fn list(&self) -> Result<Vec<Order>> {
        (**self).list().await
    }

    async fn list_by_username(&self, username: &str) -> Result<Vec<Order>> {
        (**self).list_by_username(username).await
    }

    async fn count_by_username(&self) -> Result<Vec<UserOrderCount>> {
        (**self).count_by_username().await
    }
}
