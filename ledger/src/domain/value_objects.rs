// ============================================================================
// OLYMPUS CLOUD - INVENTORY LEDGER
// ============================================================================
// Module: ledger/src/domain/value_objects.rs
// Description: Domain value objects shared by the ProductStock aggregate
// ============================================================================

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::{LedgerError, Result};

use super::events::{DomainEvent, EventHeader, SerialNumberEventPayload};

/// On-hand / allocated pair. `available_to_promise` is derived, never
/// stored directly — see `ProductStock::available_to_promise`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLevel {
    pub quantity_on_hand: i64,
    pub quantity_allocated: i64,
}

impl StockLevel {
    pub const fn zero() -> Self {
        Self {
            quantity_on_hand: 0,
            quantity_allocated: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StockStatus {
    Available,
    Quarantine,
    Damaged,
    OnHold,
    Expired,
    Returned,
    Reserved,
    Allocated,
    InTransit,
}

impl StockStatus {
    pub const ALL: [StockStatus; 9] = [
        StockStatus::Available,
        StockStatus::Quarantine,
        StockStatus::Damaged,
        StockStatus::OnHold,
        StockStatus::Expired,
        StockStatus::Returned,
        StockStatus::Reserved,
        StockStatus::Allocated,
        StockStatus::InTransit,
    ];
}

/// Mapping from status to non-negative quantity. Sum must equal
/// `quantity_on_hand` at every commit (invariant I3).
pub type StockStatusQuantity = HashMap<StockStatus, i64>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HoldType {
    Legal,
    QualityControl,
    CreditHold,
    Administrative,
    Recall,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryHold {
    pub hold_id: Uuid,
    pub hold_type: HoldType,
    pub quantity: i64,
    pub reason: String,
    pub placed_by: String,
    pub placed_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub lot_number: Option<String>,
    pub active: bool,
}

impl InventoryHold {
    /// Expiry is lazy: a hold past `expires_at` is treated as inactive the
    /// moment it's read, without a background sweep being required for
    /// correctness (though one runs anyway to keep stored state tidy).
    pub fn is_effective(&self, now: DateTime<Utc>) -> bool {
        self.active && self.expires_at.map(|exp| exp > now).unwrap_or(true)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LotStatus {
    Active,
    Quarantine,
    Expired,
    Recalled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LotBatch {
    pub lot_number: String,
    pub manufacture_date: DateTime<Utc>,
    pub expiry_date: Option<DateTime<Utc>>,
    pub status: LotStatus,
    pub quantity: i64,
    pub allocated_quantity: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AbcClass {
    A,
    B,
    C,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbcClassification {
    pub class: AbcClass,
    pub criteria: String,
    pub annual_usage_value: Decimal,
    pub classified_at: DateTime<Utc>,
    pub valid_until: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValuationMethod {
    Fifo,
    Lifo,
    WeightedAverage,
    StandardCost,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostLayer {
    pub received_at: DateTime<Utc>,
    pub quantity: i64,
    pub unit_cost: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryValuation {
    pub method: ValuationMethod,
    pub unit_cost: Decimal,
    pub total_value: Decimal,
    pub currency: String,
    pub cost_layers: Option<Vec<CostLayer>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SerialStatus {
    Received,
    Allocated,
    Shipped,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerialNumber {
    pub serial: String,
    pub sku: String,
    pub status: SerialStatus,
    pub received_at: DateTime<Utc>,
    pub order_id: Option<String>,
}

impl SerialNumber {
    /// `recordSerial(serialNumber, lotNumber?)` — serials are tracked
    /// independently of `ProductStock` (weak sku reference, spec §3.2); they
    /// don't participate in the aggregate's own invariants.
    pub fn record(sku: impl Into<String>, serial: impl Into<String>) -> (Self, DomainEvent) {
        let sku = sku.into();
        let serial = serial.into();
        let entity = Self {
            serial: serial.clone(),
            sku: sku.clone(),
            status: SerialStatus::Received,
            received_at: Utc::now(),
            order_id: None,
        };
        let event = DomainEvent::SerialNumberReceived {
            header: EventHeader::new(sku.clone()),
            payload: SerialNumberEventPayload { sku, serial, order_id: None },
        };
        (entity, event)
    }

    /// `allocateSerial(serialNumber, orderId)` — requires the serial is
    /// currently `RECEIVED`.
    pub fn allocate(&mut self, order_id: impl Into<String>) -> Result<DomainEvent> {
        if self.status != SerialStatus::Received {
            return Err(LedgerError::InvalidQuantity(format!(
                "serial {} is not RECEIVED (currently {:?})",
                self.serial, self.status
            )));
        }
        let order_id = order_id.into();
        self.status = SerialStatus::Allocated;
        self.order_id = Some(order_id.clone());
        Ok(DomainEvent::SerialNumberAllocated {
            header: EventHeader::new(self.sku.clone()),
            payload: SerialNumberEventPayload {
                sku: self.sku.clone(),
                serial: self.serial.clone(),
                order_id: Some(order_id),
            },
        })
    }

    /// `shipSerial(serialNumber)` — requires the serial is currently
    /// `ALLOCATED`.
    pub fn ship(&mut self) -> Result<DomainEvent> {
        if self.status != SerialStatus::Allocated {
            return Err(LedgerError::InvalidQuantity(format!(
                "serial {} is not ALLOCATED (currently {:?})",
                self.serial, self.status
            )));
        }
        self.status = SerialStatus::Shipped;
        Ok(DomainEvent::SerialNumberShipped {
            header: EventHeader::new(self.sku.clone()),
            payload: SerialNumberEventPayload {
                sku: self.sku.clone(),
                serial: self.serial.clone(),
                order_id: self.order_id.clone(),
            },
        })
    }
}

/// Minimal container/LPN reference (spec §1 Non-goals — "ancillary
/// aggregate with simple CRUD lifecycle"). Enough for a transfer or assembly
/// order to point at a physical container; no standalone lifecycle service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Container {
    pub container_id: String,
    pub location: String,
    pub sku: Option<String>,
    pub quantity: i64,
}

/// Reason codes accepted by `adjustStock` and related commands (spec §6.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReasonCode {
    PurchaseReceipt,
    ReturnToStock,
    TransferIn,
    ProductionComplete,
    Sale,
    Damage,
    TheftLoss,
    TransferOut,
    Disposal,
    PhysicalCount,
    CycleCount,
    SystemCorrection,
    ItemPicked,
    Allocation,
    Deallocation,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hold_expiry_is_lazy() {
        let past = Utc::now() - chrono::Duration::hours(1);
        let hold = InventoryHold {
            hold_id: Uuid::new_v4(),
            hold_type: HoldType::Administrative,
            quantity: 10,
            reason: "test".into(),
            placed_by: "operator-1".into(),
            placed_at: past,
            expires_at: Some(past),
            lot_number: None,
            active: true,
        };
        assert!(!hold.is_effective(Utc::now()));
    }

    #[test]
    fn serial_number_lifecycle_received_allocated_shipped() {
        let (mut serial, event) = SerialNumber::record("SKU-A", "SN-1");
        assert!(matches!(event, DomainEvent::SerialNumberReceived { .. }));
        assert_eq!(serial.status, SerialStatus::Received);

        let event = serial.allocate("ORD-1").unwrap();
        assert!(matches!(event, DomainEvent::SerialNumberAllocated { .. }));
        assert_eq!(serial.status, SerialStatus::Allocated);

        let event = serial.ship().unwrap();
        assert!(matches!(event, DomainEvent::SerialNumberShipped { .. }));
        assert_eq!(serial.status, SerialStatus::Shipped);
    }

    #[test]
    fn serial_number_cannot_ship_before_allocation() {
        let (mut serial, _) = SerialNumber::record("SKU-A", "SN-1");
        let err = serial.ship().unwrap_err();
        assert!(matches!(err, LedgerError::InvalidQuantity(_)));
    }
}
