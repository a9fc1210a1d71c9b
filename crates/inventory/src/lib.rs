//! Inventory ledger for the order fulfillment services.
//!
//! The ledger owns one quantity counter per product code, applies signed
//! deltas to it and answers availability queries. It knows nothing about
//! orders. Two kinds of adjustment are offered:
//!
//! - [`InventoryLedger::adjust`] applies a delta unconditionally and may
//!   leave a counter negative; it is meant for restores and stock intake.
//! - [`InventoryLedger::try_adjust`] applies a delta only if the counter
//!   stays at or above zero, as one atomic step per product code. Reserving
//!   stock must go through this call.

pub mod error;
pub mod ledger;
pub mod memory;
pub mod postgres;
pub mod record;
pub mod seed;

pub use common::ProductCode;
pub use error::{InventoryError, Result};
pub use ledger::InventoryLedger;
pub use memory::InMemoryInventoryLedger;
pub use postgres::PostgresInventoryLedger;
pub use record::{AdjustOutcome, InventoryRecord, StockAdjustment, StockUnit};
pub use seed::{DEMO_STOCK, seed_demo_inventory};
