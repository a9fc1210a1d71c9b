//! Demo stock loaded at startup when seeding is enabled.

use crate::{InventoryLedger, Result, StockAdjustment};

/// Product codes and piece counts of the demo catalogue.
pub const DEMO_STOCK: &[(&str, i64)] = &[
    ("DELL-XPS-15", 10),
    ("IPHONE-15-PRO", 20),
    ("GALAXY-BUDS-2", 50),
];

/// Loads [`DEMO_STOCK`] into an empty ledger.
///
/// Does nothing if the ledger already holds any record. Returns the number
/// of products seeded.
pub async fn seed_demo_inventory<L: InventoryLedger + ?Sized>(ledger: &L) -> Result<usize> {
    if !ledger.list().await?.is_empty() {
        tracing::info!("Inventory already populated, skipping seed");
        return Ok(0);
    }

    for (code, quantity) in DEMO_STOCK {
        ledger
            .adjust(StockAdjustment::pieces(*code, *quantity))
            .await?;
    }

    tracing::info!(products = DEMO_STOCK.len(), "Seeded demo inventory");
    Ok(DEMO_STOCK.len())
}
