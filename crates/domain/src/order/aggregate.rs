//! Order aggregate implementation.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use common::{OrderId, ProductCode, Version};
use serde::{Deserialize, Serialize};

use super::{Money, OrderError, OrderLineItem, OrderNumber, OrderStatus};

/// Order aggregate root.
///
/// Owns its line items exclusively. While the order is not cancelled, the
/// per-product sum of its line quantities equals the stock taken from the
/// inventory ledger on its behalf.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    order_number: OrderNumber,
    username: String,
    status: OrderStatus,
    line_items: Vec<OrderLineItem>,

    /// Current stored version for optimistic concurrency.
    #[serde(default)]
    version: Version,

    created_at: DateTime<Utc>,
}

/// The effect of setting a product's quantity on an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuantityChange {
    pub product_code: ProductCode,
    pub old_quantity: u64,
    pub new_quantity: u32,
}

impl QuantityChange {
    /// Signed difference `new - old`; positive means more stock is needed.
    pub fn delta(&self) -> i64 {
        self.new_quantity as i64 - self.old_quantity as i64
    }

    /// Returns true when nothing changes.
    pub fn is_noop(&self) -> bool {
        self.delta() == 0
    }
}

// Construction
impl Order {
    /// Builds a new `PendingValidation` order with a fresh id and order number.
    ///
    /// Line items are kept exactly as given (duplicates included).
    pub fn place(
        username: impl Into<String>,
        line_items: Vec<OrderLineItem>,
    ) -> Result<Self, OrderError> {
        let username = username.into();
        if username.trim().is_empty() {
            return Err(OrderError::UsernameRequired);
        }

        if line_items.is_empty() {
            return Err(OrderError::NoLineItems);
        }

        let mut total = Money::zero();
        for item in &line_items {
            if item.product_code.is_blank() {
                return Err(OrderError::ProductCodeRequired);
            }
            if item.quantity == 0 {
                return Err(OrderError::InvalidQuantity {
                    product_code: item.product_code.to_string(),
                    quantity: item.quantity,
                });
            }
            if item.price.is_negative() {
                return Err(OrderError::InvalidPrice {
                    product_code: item.product_code.to_string(),
                    price: item.price.cents(),
                });
            }
            total = item
                .checked_total_price()
                .and_then(|line_total| total.checked_add(line_total))
                .ok_or_else(|| OrderError::AmountOverflow {
                    product_code: item.product_code.to_string(),
                })?;
        }

        Ok(Self {
            id: OrderId::new(),
            order_number: OrderNumber::generate(),
            username,
            status: OrderStatus::PendingValidation,
            line_items,
            version: Version::initial(),
            created_at: Utc::now(),
        })
    }

    /// Rebuilds an order from stored fields.
    pub fn rehydrate(
        id: OrderId,
        order_number: OrderNumber,
        username: String,
        status: OrderStatus,
        line_items: Vec<OrderLineItem>,
        version: Version,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            order_number,
            username,
            status,
            line_items,
            version,
            created_at,
        }
    }
}

// Query methods
impl Order {
    /// Returns the order ID.
    pub fn id(&self) -> OrderId {
        self.id
    }

    /// Returns the order number.
    pub fn order_number(&self) -> &OrderNumber {
        &self.order_number
    }

    /// Returns the owner's username.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Returns the current status.
    pub fn status(&self) -> OrderStatus {
        self.status
    }

    /// Returns the line items in order.
    pub fn line_items(&self) -> &[OrderLineItem] {
        &self.line_items
    }

    /// Returns the stored version.
    pub fn version(&self) -> Version {
        self.version
    }

    /// Sets the stored version. Used by order stores after a successful write.
    pub fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    /// Returns the creation timestamp.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the total amount of the order.
    ///
    /// Saturates at the bounds of `i64` cents for orders rebuilt from storage
    /// with totals that no longer fit.
    pub fn total_amount(&self) -> Money {
        self.line_items.iter().map(OrderLineItem::total_price).sum()
    }

    /// Total the order would have if `product_code` were set to `new_quantity`,
    /// with duplicate lines collapsed the way [`Order::set_quantity`] does.
    /// `None` on overflow.
    fn total_with_quantity(
        &self,
        product_code: &ProductCode,
        new_quantity: u32,
    ) -> Option<Money> {
        let mut seen = false;
        self.line_items
            .iter()
            .try_fold(Money::zero(), |total, item| {
                if &item.product_code != product_code {
                    return total.checked_add(item.checked_total_price()?);
                }
                if seen {
                    return Some(total);
                }
                seen = true;
                total.checked_add(item.price.checked_multiply(new_quantity)?)
            })
    }

    /// Quantities per product code, summed across duplicate lines.
    ///
    /// Sorted by product code so callers touch the ledger in a stable order.
    pub fn reserved_quantities(&self) -> BTreeMap<ProductCode, u64> {
        aggregate_quantities(&self.line_items)
    }

    /// Total quantity ordered for a product, `None` if the order has no such line.
    pub fn quantity_of(&self, product_code: &ProductCode) -> Option<u64> {
        let mut lines = self
            .line_items
            .iter()
            .filter(|item| &item.product_code == product_code)
            .peekable();
        lines.peek()?;
        Some(lines.map(|item| item.quantity as u64).sum())
    }
}

// State transitions
impl Order {
    /// Moves a pending order to `Validated`. No stock effect.
    pub fn validate(&mut self) -> Result<(), OrderError> {
        if !self.status.can_validate() {
            return Err(OrderError::InvalidStateTransition {
                current_state: self.status,
                action: "validate",
            });
        }
        self.status = OrderStatus::Validated;
        Ok(())
    }

    /// Cancels the order. Rejected if it is already cancelled.
    pub fn cancel(&mut self) -> Result<(), OrderError> {
        if !self.status.can_cancel() {
            return Err(OrderError::InvalidStateTransition {
                current_state: self.status,
                action: "cancel",
            });
        }
        self.status = OrderStatus::Cancelled;
        Ok(())
    }

    /// Computes what setting `product_code` to `new_quantity` would change,
    /// without touching the order.
    pub fn quantity_change(
        &self,
        product_code: &ProductCode,
        new_quantity: u32,
    ) -> Result<QuantityChange, OrderError> {
        if !self.status.can_amend() {
            return Err(OrderError::InvalidStateTransition {
                current_state: self.status,
                action: "amend quantity",
            });
        }

        let old_quantity =
            self.quantity_of(product_code)
                .ok_or_else(|| OrderError::ItemNotFound {
                    product_code: product_code.to_string(),
                })?;

        if self.total_with_quantity(product_code, new_quantity).is_none() {
            return Err(OrderError::AmountOverflow {
                product_code: product_code.to_string(),
            });
        }

        Ok(QuantityChange {
            product_code: product_code.clone(),
            old_quantity,
            new_quantity,
        })
    }

    /// Sets the quantity for a product.
    ///
    /// The first line for the product keeps the new quantity and any duplicate
    /// lines for it are dropped. A quantity of 0 removes the product entirely,
    /// and an order left without lines is cancelled.
    pub fn set_quantity(
        &mut self,
        product_code: &ProductCode,
        new_quantity: u32,
    ) -> Result<QuantityChange, OrderError> {
        let change = self.quantity_change(product_code, new_quantity)?;
        if change.is_noop() {
            return Ok(change);
        }

        let mut kept = false;
        self.line_items.retain_mut(|item| {
            if &item.product_code != product_code {
                return true;
            }
            if kept || new_quantity == 0 {
                return false;
            }
            item.quantity = new_quantity;
            kept = true;
            true
        });

        if self.line_items.is_empty() {
            self.status = OrderStatus::Cancelled;
        }

        Ok(change)
    }
}

/// Sums quantities per product code.
pub fn aggregate_quantities(line_items: &[OrderLineItem]) -> BTreeMap<ProductCode, u64> {
    let mut totals = BTreeMap::new();
    for item in line_items {
        *totals.entry(item.product_code.clone()).or_insert(0) += item.quantity as u64;
    }
    totals
}
