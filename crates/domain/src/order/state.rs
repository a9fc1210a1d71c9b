//! Order status machine.

use serde::{Deserialize, Serialize};

use super::OrderError;

/// The status of an order in its lifecycle.
///
/// State transitions:
/// ```text
/// PendingValidation ──┬──► Validated ──► Cancelled
///                     └──────────────────► Cancelled
/// ```
///
/// Stock stays reserved in every status except `Cancelled`. Only a
/// `PendingValidation` order accepts stock-affecting amendments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Stock has been reserved, awaiting validation.
    #[default]
    PendingValidation,

    /// Order was validated; no further amendments.
    Validated,

    /// Order was cancelled and its stock restored (terminal state).
    Cancelled,
}

impl OrderStatus {
    /// Returns true if the order can be validated in this status.
    pub fn can_validate(&self) -> bool {
        matches!(self, OrderStatus::PendingValidation)
    }

    /// Returns true if the order can be cancelled in this status.
    pub fn can_cancel(&self) -> bool {
        !matches!(self, OrderStatus::Cancelled)
    }

    /// Returns true if line quantities can be amended in this status.
    pub fn can_amend(&self) -> bool {
        matches!(self, OrderStatus::PendingValidation)
    }

    /// Returns true while the order's line items hold stock taken from the ledger.
    pub fn holds_stock(&self) -> bool {
        !matches!(self, OrderStatus::Cancelled)
    }

    /// Returns true if this is a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Cancelled)
    }

    /// Returns the status name as stored and exposed on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::PendingValidation => "PENDING_VALIDATION",
            OrderStatus::Validated => "VALIDATED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING_VALIDATION" => Ok(OrderStatus::PendingValidation),
            "VALIDATED" => Ok(OrderStatus::Validated),
            "CANCELLED" => Ok(OrderStatus::Cancelled),
            other => Err(OrderError::UnknownStatus(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_status_is_pending_validation() {
        assert_eq!(OrderStatus::default(), OrderStatus::PendingValidation);
    }

    #[test]
    fn test_only_pending_can_validate() {
        assert!(OrderStatus::PendingValidation.can_validate());
        assert!(!OrderStatus::Validated.can_validate());
        assert!(!OrderStatus::Cancelled.can_validate());
    }

    #[test]
    fn test_validated_orders_can_still_be_cancelled() {
        assert!(OrderStatus::PendingValidation.can_cancel());
        assert!(OrderStatus::Validated.can_cancel());
        assert!(!OrderStatus::Cancelled.can_cancel());
    }

    #[test]
    fn test_only_pending_can_amend() {
        assert!(OrderStatus::PendingValidation.can_amend());
        assert!(!OrderStatus::Validated.can_amend());
        assert!(!OrderStatus::Cancelled.can_amend());
    }

    #[test]
    fn test_stock_held_until_cancelled() {
        assert!(OrderStatus::PendingValidation.holds_stock());
        assert!(OrderStatus::Validated.holds_stock());
        assert!(!OrderStatus::Cancelled.holds_stock());
        assert!(OrderStatus::Cancelled.is_terminal());
    }

    #[test]
    fn test_parse_round_trips_display() {
        for status in [
            OrderStatus::PendingValidation,
            OrderStatus::Validated,
            OrderStatus::Cancelled,
        ] {
            assert_eq!(status.to_string().parse::<OrderStatus>().unwrap(), status);
        }
        assert!("SHIPPED".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn test_serialization_uses_wire_names() {
        let json = serde_json::to_string(&OrderStatus::PendingValidation).unwrap();
        assert_eq!(json, "\"PENDING_VALIDATION\"");
    }
}
