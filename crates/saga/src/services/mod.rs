//! Ports to the systems the protocol coordinates with.

pub mod http;
pub mod inventory;

pub use http::HttpInventoryClient;
pub use inventory::{InventoryClient, LedgerInventoryClient};
