//! Ledger records and adjustment requests.

use serde::{Deserialize, Serialize};

use crate::{InventoryError, ProductCode, Result};

/// Stock counter for one product code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryRecord {
    pub product_code: ProductCode,
    pub quantity: i64,
}

impl InventoryRecord {
    /// Creates a record.
    pub fn new(product_code: impl Into<ProductCode>, quantity: i64) -> Self {
        Self {
            product_code: product_code.into(),
            quantity,
        }
    }
}

/// Unit an adjustment delta is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StockUnit {
    #[default]
    Piece,
    Carton,
}

impl StockUnit {
    /// Returns the unit name as used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            StockUnit::Piece => "PIECE",
            StockUnit::Carton => "CARTON",
        }
    }
}

impl std::fmt::Display for StockUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for StockUnit {
    type Err = InventoryError;

    fn from_str(s: &str) -> Result<Self> {
        if s.eq_ignore_ascii_case("PIECE") {
            Ok(StockUnit::Piece)
        } else if s.eq_ignore_ascii_case("CARTON") {
            Ok(StockUnit::Carton)
        } else {
            Err(InventoryError::InvalidAdjustment(format!(
                "unknown unit '{s}'"
            )))
        }
    }
}

/// A signed change to one product's counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockAdjustment {
    pub product_code: ProductCode,
    pub delta: i64,
    #[serde(default)]
    pub unit: StockUnit,
    #[serde(default)]
    pub pieces_per_carton: Option<i64>,
}

impl StockAdjustment {
    /// Adjustment expressed in pieces.
    pub fn pieces(product_code: impl Into<ProductCode>, delta: i64) -> Self {
        Self {
            product_code: product_code.into(),
            delta,
            unit: StockUnit::Piece,
            pieces_per_carton: None,
        }
    }

    /// Adjustment expressed in cartons.
    pub fn cartons(
        product_code: impl Into<ProductCode>,
        delta: i64,
        pieces_per_carton: Option<i64>,
    ) -> Self {
        Self {
            product_code: product_code.into(),
            delta,
            unit: StockUnit::Carton,
            pieces_per_carton,
        }
    }

    /// The delta converted to pieces.
    ///
    /// Cartons are multiplied by `pieces_per_carton`, or by 1 when it is absent.
    pub fn delta_in_pieces(&self) -> Result<i64> {
        if self.product_code.is_blank() {
            return Err(InventoryError::InvalidAdjustment(
                "product code is required".to_string(),
            ));
        }

        match self.unit {
            StockUnit::Piece => Ok(self.delta),
            StockUnit::Carton => {
                let factor = self.pieces_per_carton.unwrap_or(1);
                if factor <= 0 {
                    return Err(InventoryError::InvalidAdjustment(format!(
                        "pieces per carton must be positive, got {factor}"
                    )));
                }
                self.delta
                    .checked_mul(factor)
                    .ok_or_else(|| InventoryError::Overflow(self.product_code.clone()))
            }
        }
    }
}

/// Result of a conditional adjustment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdjustOutcome {
    /// The delta was applied; the record holds the new quantity.
    Applied(InventoryRecord),
    /// The delta would have taken the counter below zero; nothing changed.
    Insufficient { available: i64 },
}

impl AdjustOutcome {
    /// Returns true if the delta was applied.
    pub fn is_applied(&self) -> bool {
        matches!(self, AdjustOutcome::Applied(_))
    }
}
