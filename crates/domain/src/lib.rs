//! Domain layer for order fulfillment.
//!
//! This crate provides the Order aggregate: its line items, its status
//! machine and the rules that decide which transitions and amendments are
//! allowed. It has no knowledge of storage or of the inventory ledger.

pub mod order;

pub use order::{
    Money, Order, OrderError, OrderLineItem, OrderNumber, OrderStatus, QuantityChange,
    aggregate_quantities,
};
