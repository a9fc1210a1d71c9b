//! Identifiers shared between the order and inventory sides.

pub mod types;

pub use types::{OrderId, ProductCode, Version};
