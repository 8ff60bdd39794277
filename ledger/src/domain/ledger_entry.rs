// ============================================================================
// OLYMPUS CLOUD - INVENTORY LEDGER
// ============================================================================
// Module: ledger/src/domain/ledger_entry.rs
// Description: InventoryLedgerEntry — immutable audit record factory (C4).
//              One entry per stock-changing operation; never updated once
//              created. Status-only changes that carry zero quantity delta
//              skip ledger entry creation (spec §4.2 step 3).
// ============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeType {
    Allocation,
    Deallocation,
    Pick,
    Receipt,
    AdjustmentPositive,
    AdjustmentNegative,
    CycleCount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryLedgerEntry {
    pub id: Uuid,
    pub sku: String,
    pub timestamp: DateTime<Utc>,
    pub quantity_change: i64,
    pub change_type: ChangeType,
    pub source_reference: Option<String>,
    pub reason: String,
    pub operator_id: Option<String>,
}

impl InventoryLedgerEntry {
    pub fn new(
        sku: impl Into<String>,
        quantity_change: i64,
        change_type: ChangeType,
        reason: impl Into<String>,
        source_reference: Option<String>,
        operator_id: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            sku: sku.into(),
            timestamp: Utc::now(),
            quantity_change,
            change_type,
            source_reference,
            reason: reason.into(),
            operator_id,
        }
    }

    /// Derives the change type for a signed adjustment delta. Allocation,
    /// deallocation, pick, and receipt are distinguished by their own call
    /// sites; this helper only covers the generic `adjustQuantityOnHand`
    /// path where the sign alone determines the ledger bucket.
    pub fn adjustment_change_type(delta: i64) -> ChangeType {
        if delta >= 0 {
            ChangeType::AdjustmentPositive
        } else {
            ChangeType::AdjustmentNegative
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adjustment_change_type_follows_sign() {
        assert_eq!(InventoryLedgerEntry::adjustment_change_type(5), ChangeType::AdjustmentPositive);
        assert_eq!(InventoryLedgerEntry::adjustment_change_type(-5), ChangeType::AdjustmentNegative);
    }
}
