//! Order Store: persists Order aggregates (order, line items, status).
//!
//! The store holds no business rules. It only guarantees that an update is
//! applied against the version the caller loaded, so two writers racing on
//! the same order cannot both succeed.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

pub use common::{OrderId, Version};
pub use error::{Result, StoreError};
pub use memory::InMemoryOrderStore;
pub use postgres::PostgresOrderStore;
pub use store::{OrderStore, UserOrderCount};
