// ============================================================================
// OLYMPUS CLOUD - INVENTORY LEDGER
// ============================================================================
// Module: ledger/src/domain/state_machines.rs
// Description: StockTransfer and AssemblyOrder lifecycle state machines
//              (spec §4.6). Neither participates in the ProductStock
//              invariants directly; they drive ProductStock mutations
//              (receive/allocate) through the command service.
// ============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{LedgerError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransferStatus {
    Initiated,
    InTransit,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockTransfer {
    pub transfer_id: Uuid,
    pub sku: String,
    pub from_location: String,
    pub to_location: String,
    pub planned_quantity: i64,
    pub actual_quantity_received: Option<i64>,
    pub status: TransferStatus,
    pub created_at: DateTime<Utc>,
}

impl StockTransfer {
    pub fn initiate(sku: impl Into<String>, from_location: impl Into<String>, to_location: impl Into<String>, planned_quantity: i64) -> Result<Self> {
        if planned_quantity <= 0 {
            return Err(LedgerError::InvalidQuantity("transfer quantity must be positive".into()));
        }
        Ok(Self {
            transfer_id: Uuid::new_v4(),
            sku: sku.into(),
            from_location: from_location.into(),
            to_location: to_location.into(),
            planned_quantity,
            actual_quantity_received: None,
            status: TransferStatus::Initiated,
            created_at: Utc::now(),
        })
    }

    pub fn ship(&mut self) -> Result<()> {
        if self.status != TransferStatus::Initiated {
            return Err(LedgerError::InvariantViolation(format!(
                "cannot ship transfer {} from state {:?}",
                self.transfer_id, self.status
            )));
        }
        self.status = TransferStatus::InTransit;
        Ok(())
    }

    /// Terminal. `shrinkage = planned − actual` is recorded on the caller's
    /// ledger entry, not on the transfer itself (spec §4.6).
    pub fn complete(&mut self, actual_quantity_received: i64) -> Result<i64> {
        if self.status != TransferStatus::InTransit {
            return Err(LedgerError::InvariantViolation(format!(
                "cannot complete transfer {} from state {:?}",
                self.transfer_id, self.status
            )));
        }
        if actual_quantity_received < 0 {
            return Err(LedgerError::InvalidQuantity("actual quantity received cannot be negative".into()));
        }
        self.status = TransferStatus::Completed;
        self.actual_quantity_received = Some(actual_quantity_received);
        Ok(self.planned_quantity - actual_quantity_received)
    }

    pub fn cancel(&mut self) -> Result<()> {
        if matches!(self.status, TransferStatus::Completed | TransferStatus::Cancelled) {
            return Err(LedgerError::InvariantViolation(format!(
                "cannot cancel terminal transfer {}",
                self.transfer_id
            )));
        }
        self.status = TransferStatus::Cancelled;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssemblyOrderStatus {
    Created,
    InProgress,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssemblyOrder {
    pub order_id: Uuid,
    pub output_sku: String,
    pub planned_quantity: i64,
    pub actual_quantity: Option<i64>,
    pub component_skus_allocated: Vec<String>,
    pub status: AssemblyOrderStatus,
}

impl AssemblyOrder {
    pub fn create(output_sku: impl Into<String>, planned_quantity: i64) -> Result<Self> {
        if planned_quantity <= 0 {
            return Err(LedgerError::InvalidQuantity("assembly order quantity must be positive".into()));
        }
        Ok(Self {
            order_id: Uuid::new_v4(),
            output_sku: output_sku.into(),
            planned_quantity,
            actual_quantity: None,
            component_skus_allocated: Vec::new(),
            status: AssemblyOrderStatus::Created,
        })
    }

    /// Requires all component allocations present (spec §4.6).
    pub fn start(&mut self, component_skus_allocated: Vec<String>) -> Result<()> {
        if self.status != AssemblyOrderStatus::Created {
            return Err(LedgerError::InvariantViolation(format!(
                "cannot start assembly order {} from state {:?}",
                self.order_id, self.status
            )));
        }
        if component_skus_allocated.is_empty() {
            return Err(LedgerError::InvariantViolation(
                "assembly order cannot start without component allocations".into(),
            ));
        }
        self.component_skus_allocated = component_skus_allocated;
        self.status = AssemblyOrderStatus::InProgress;
        Ok(())
    }

    /// Requires `actualQty ≤ plannedQty`.
    pub fn complete(&mut self, actual_quantity: i64) -> Result<()> {
        if self.status != AssemblyOrderStatus::InProgress {
            return Err(LedgerError::InvariantViolation(format!(
                "cannot complete assembly order {} from state {:?}",
                self.order_id, self.status
            )));
        }
        if actual_quantity > self.planned_quantity || actual_quantity < 0 {
            return Err(LedgerError::InvalidQuantity(format!(
                "actual quantity {actual_quantity} out of bounds for planned {}",
                self.planned_quantity
            )));
        }
        self.actual_quantity = Some(actual_quantity);
        self.status = AssemblyOrderStatus::Completed;
        Ok(())
    }

    pub fn cancel(&mut self) -> Result<()> {
        if !matches!(self.status, AssemblyOrderStatus::Created | AssemblyOrderStatus::InProgress) {
            return Err(LedgerError::InvariantViolation(format!(
                "cannot cancel assembly order {} from state {:?}",
                self.order_id, self.status
            )));
        }
        self.status = AssemblyOrderStatus::Cancelled;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transfer_happy_path_and_shrinkage() {
        let mut transfer = StockTransfer::initiate("SKU-A", "DC1", "DC2", 100).unwrap();
        transfer.ship().unwrap();
        let shrinkage = transfer.complete(95).unwrap();
        assert_eq!(shrinkage, 5);
        assert_eq!(transfer.status, TransferStatus::Completed);
    }

    #[test]
    fn transfer_cancel_from_any_non_terminal_state() {
        let mut transfer = StockTransfer::initiate("SKU-A", "DC1", "DC2", 10).unwrap();
        transfer.cancel().unwrap();
        assert_eq!(transfer.status, TransferStatus::Cancelled);
        assert!(transfer.cancel().is_err());
    }

    #[test]
    fn assembly_order_requires_component_allocations_to_start() {
        let mut order = AssemblyOrder::create("SKU-FINISHED", 10).unwrap();
        assert!(order.start(vec![]).is_err());
        order.start(vec!["SKU-PART-1".into()]).unwrap();
        assert_eq!(order.status, AssemblyOrderStatus::InProgress);
    }

    #[test]
    fn assembly_order_complete_cannot_exceed_planned() {
        let mut order = AssemblyOrder::create("SKU-FINISHED", 10).unwrap();
        order.start(vec!["SKU-PART-1".into()]).unwrap();
        assert!(order.complete(11).is_err());
        order.complete(10).unwrap();
        assert_eq!(order.status, AssemblyOrderStatus::Completed);
    }
}
