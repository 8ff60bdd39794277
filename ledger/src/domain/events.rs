// ============================================================================
// OLYMPUS CLOUD - INVENTORY LEDGER
// ============================================================================
// Module: ledger/src/domain/events.rs
// Description: Domain events produced by ProductStock mutations. Each
//              variant carries a stable wire type string (spec §6.2) and a
//              payload with pinned snake_case field names — do not rename
//              fields for Rust-side consistency, the wire shape is
//              authoritative.
// ============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::value_objects::{AbcClass, HoldType, ReasonCode, ValuationMethod};

/// Common header every event carries, independent of its payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventHeader {
    pub event_id: Uuid,
    pub aggregate_id: String,
    pub occurred_on: DateTime<Utc>,
}

impl EventHeader {
    pub fn new(aggregate_id: impl Into<String>) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            aggregate_id: aggregate_id.into(),
            occurred_on: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockLevelSnapshot {
    pub quantity_on_hand: i64,
    pub quantity_allocated: i64,
    pub available_to_promise: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockLevelChangedPayload {
    pub sku: String,
    pub previous_stock_level: StockLevelSnapshot,
    pub new_stock_level: StockLevelSnapshot,
    pub change_reason: ReasonCode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockStatusChangedPayload {
    pub sku: String,
    #[serde(rename = "previousStatus")]
    pub previous_status: String,
    #[serde(rename = "newStatus")]
    pub new_status: String,
    pub quantity: i64,
    pub reason: String,
    pub lot_number: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryHoldPlacedPayload {
    pub sku: String,
    pub hold_id: Uuid,
    pub hold_type: HoldType,
    pub quantity_on_hold: i64,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryHoldReleasedPayload {
    pub sku: String,
    pub hold_id: Uuid,
    pub hold_type: HoldType,
    pub quantity_released: i64,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryValuationChangedPayload {
    pub sku: String,
    pub valuation_method: ValuationMethod,
    pub previous_unit_cost: rust_decimal::Decimal,
    pub new_unit_cost: rust_decimal::Decimal,
    pub previous_total_value: rust_decimal::Decimal,
    pub new_total_value: rust_decimal::Decimal,
    pub quantity: i64,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AbcClassificationChangedPayload {
    pub sku: String,
    pub previous_class: Option<AbcClass>,
    pub new_class: AbcClass,
    pub criteria: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockTransferEventPayload {
    pub transfer_id: Uuid,
    pub sku: String,
    pub from_location: String,
    pub to_location: String,
    pub quantity: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerialNumberEventPayload {
    pub sku: String,
    pub serial: String,
    pub order_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventorySnapshotCreatedPayload {
    pub sku: String,
    pub snapshot_id: Uuid,
    pub snapshot_type: String,
}

/// Tagged union of every domain event the ProductStock aggregate (and the
/// transfer/assembly state machines) can emit. `event_type()` returns the
/// stable wire type string from the spec §6.2 catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum DomainEvent {
    StockLevelChanged {
        header: EventHeader,
        payload: StockLevelChangedPayload,
    },
    StockStatusChanged {
        header: EventHeader,
        payload: StockStatusChangedPayload,
    },
    InventoryHoldPlaced {
        header: EventHeader,
        payload: InventoryHoldPlacedPayload,
    },
    InventoryHoldReleased {
        header: EventHeader,
        payload: InventoryHoldReleasedPayload,
    },
    InventoryValuationChanged {
        header: EventHeader,
        payload: InventoryValuationChangedPayload,
    },
    AbcClassificationChanged {
        header: EventHeader,
        payload: AbcClassificationChangedPayload,
    },
    StockTransferInitiated {
        header: EventHeader,
        payload: StockTransferEventPayload,
    },
    StockTransferCompleted {
        header: EventHeader,
        payload: StockTransferEventPayload,
    },
    SerialNumberReceived {
        header: EventHeader,
        payload: SerialNumberEventPayload,
    },
    SerialNumberAllocated {
        header: EventHeader,
        payload: SerialNumberEventPayload,
    },
    SerialNumberShipped {
        header: EventHeader,
        payload: SerialNumberEventPayload,
    },
    InventorySnapshotCreated {
        header: EventHeader,
        payload: InventorySnapshotCreatedPayload,
    },
}

impl DomainEvent {
    pub fn header(&self) -> &EventHeader {
        match self {
            DomainEvent::StockLevelChanged { header, .. }
            | DomainEvent::StockStatusChanged { header, .. }
            | DomainEvent::InventoryHoldPlaced { header, .. }
            | DomainEvent::InventoryHoldReleased { header, .. }
            | DomainEvent::InventoryValuationChanged { header, .. }
            | DomainEvent::AbcClassificationChanged { header, .. }
            | DomainEvent::StockTransferInitiated { header, .. }
            | DomainEvent::StockTransferCompleted { header, .. }
            | DomainEvent::SerialNumberReceived { header, .. }
            | DomainEvent::SerialNumberAllocated { header, .. }
            | DomainEvent::SerialNumberShipped { header, .. }
            | DomainEvent::InventorySnapshotCreated { header, .. } => header,
        }
    }

    /// Wire type string per spec §6.2's authoritative catalog, wrapped in
    /// the CloudEvents `com.paklog.inventory.fulfillment.v1.<aggregate>.<event>`
    /// namespace convention.
    pub fn event_type(&self) -> &'static str {
        match self {
            DomainEvent::StockLevelChanged { .. } => {
                "com.paklog.inventory.fulfillment.v1.product-stock.level-changed"
            }
            DomainEvent::StockStatusChanged { .. } => {
                "com.paklog.inventory.fulfillment.v1.product-stock.status-changed"
            }
            DomainEvent::InventoryHoldPlaced { .. } => {
                "com.paklog.inventory.fulfillment.v1.inventory-hold.placed"
            }
            DomainEvent::InventoryHoldReleased { .. } => {
                "com.paklog.inventory.fulfillment.v1.inventory-hold.released"
            }
            DomainEvent::InventoryValuationChanged { .. } => {
                "com.paklog.inventory.fulfillment.v1.inventory-valuation.changed"
            }
            DomainEvent::AbcClassificationChanged { .. } => {
                "com.paklog.inventory.fulfillment.v1.abc-classification.changed"
            }
            DomainEvent::StockTransferInitiated { .. } => {
                "com.paklog.inventory.fulfillment.v1.stock-transfer.initiated"
            }
            DomainEvent::StockTransferCompleted { .. } => {
                "com.paklog.inventory.fulfillment.v1.stock-transfer.completed"
            }
            DomainEvent::SerialNumberReceived { .. } => {
                "com.paklog.inventory.fulfillment.v1.serial-number.received"
            }
            DomainEvent::SerialNumberAllocated { .. } => {
                "com.paklog.inventory.fulfillment.v1.serial-number.allocated"
            }
            DomainEvent::SerialNumberShipped { .. } => {
                "com.paklog.inventory.fulfillment.v1.serial-number.shipped"
            }
            DomainEvent::InventorySnapshotCreated { .. } => {
                "com.paklog.inventory.fulfillment.v1.inventory-snapshot.created"
            }
        }
    }

    /// JSON payload as it belongs in an `EventEnvelope.data` field.
    pub fn payload_json(&self) -> serde_json::Result<serde_json::Value> {
        match self {
            DomainEvent::StockLevelChanged { payload, .. } => serde_json::to_value(payload),
            DomainEvent::StockStatusChanged { payload, .. } => serde_json::to_value(payload),
            DomainEvent::InventoryHoldPlaced { payload, .. } => serde_json::to_value(payload),
            DomainEvent::InventoryHoldReleased { payload, .. } => serde_json::to_value(payload),
            DomainEvent::InventoryValuationChanged { payload, .. } => serde_json::to_value(payload),
            DomainEvent::AbcClassificationChanged { payload, .. } => serde_json::to_value(payload),
            DomainEvent::StockTransferInitiated { payload, .. } => serde_json::to_value(payload),
            DomainEvent::StockTransferCompleted { payload, .. } => serde_json::to_value(payload),
            DomainEvent::SerialNumberReceived { payload, .. } => serde_json::to_value(payload),
            DomainEvent::SerialNumberAllocated { payload, .. } => serde_json::to_value(payload),
            DomainEvent::SerialNumberShipped { payload, .. } => serde_json::to_value(payload),
            DomainEvent::InventorySnapshotCreated { payload, .. } => serde_json::to_value(payload),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_type_matches_catalog() {
        let event = DomainEvent::StockLevelChanged {
            header: EventHeader::new("SKU-1"),
            payload: StockLevelChangedPayload {
                sku: "SKU-1".into(),
                previous_stock_level: StockLevelSnapshot {
                    quantity_on_hand: 0,
                    quantity_allocated: 0,
                    available_to_promise: 0,
                },
                new_stock_level: StockLevelSnapshot {
                    quantity_on_hand: 100,
                    quantity_allocated: 0,
                    available_to_promise: 100,
                },
                change_reason: ReasonCode::PurchaseReceipt,
            },
        };
        assert_eq!(
            event.event_type(),
            "com.paklog.inventory.fulfillment.v1.product-stock.level-changed"
        );
        let json = event.payload_json().unwrap();
        assert_eq!(json["sku"], "SKU-1");
        assert_eq!(json["previous_stock_level"]["quantity_on_hand"], 0);
    }
}
