//! Stock adjustment protocol for order fulfillment.
//!
//! Orders and inventory live in separate systems that share no transaction.
//! This crate keeps them in agreement with a small saga per operation:
//!
//! 1. Placement reserves stock with conditional decrements, then persists the
//!    order. A refused decrement or a failed write undoes the decrements
//!    already applied.
//! 2. Cancellation persists the cancelled order first, then restores the
//!    stock the order held.
//! 3. Amendment adjusts the ledger by the quantity delta, then persists the
//!    amended order, undoing the adjustment if the write fails.
//!
//! The inventory ledger is reached through the [`InventoryClient`] port,
//! either in process or over HTTP.

pub mod coordinator;
pub mod error;
pub mod order_fulfillment;
pub mod service;
pub mod services;

pub use coordinator::{OrderLineRequest, PlaceOrder, PlacedOrder, StockAdjustmentCoordinator};
pub use error::{Result, SagaError};
pub use service::OrderOrchestrator;
pub use services::{HttpInventoryClient, InventoryClient, LedgerInventoryClient};
