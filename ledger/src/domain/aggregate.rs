// ============================================================================
// OLYMPUS CLOUD - INVENTORY LEDGER
// ============================================================================
// Module: ledger/src/domain/aggregate.rs
// Description: ProductStock — the invariant-enforcing aggregate root (C3).
//              Every mutation validates preconditions, applies the change,
//              re-checks invariants, and appends events to `pending_events`.
//              Operations that fail a precondition must not mutate state or
//              emit events (spec §4.1).
// ============================================================================

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{LedgerError, Result};

use super::events::{
    AbcClassificationChangedPayload, DomainEvent, EventHeader, InventoryHoldPlacedPayload,
    InventoryHoldReleasedPayload, InventoryValuationChangedPayload, StockLevelChangedPayload,
    StockLevelSnapshot, StockStatusChangedPayload,
};
use super::value_objects::{
    AbcClass, AbcClassification, HoldType, InventoryHold, InventoryValuation, LotBatch,
    LotStatus, ReasonCode, StockLevel, StockStatus, StockStatusQuantity, ValuationMethod,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductStock {
    pub sku: String,
    pub stock_level: StockLevel,
    pub stock_status_quantity: StockStatusQuantity,
    pub holds: Vec<InventoryHold>,
    pub lot_batches: Vec<LotBatch>,
    pub abc_classification: Option<AbcClassification>,
    pub valuation: Option<InventoryValuation>,
    pub version: i64,
    pub last_updated: DateTime<Utc>,

    #[serde(skip)]
    pub pending_events: Vec<DomainEvent>,
}

impl ProductStock {
    /// Create a fresh aggregate at zero stock. Both implicit
    /// creation-on-receipt and this explicit constructor are supported
    /// (spec §9 open question); callers should prefer this for auditability.
    pub fn create(sku: impl Into<String>) -> Self {
        let mut stock_status_quantity = StockStatusQuantity::new();
        stock_status_quantity.insert(StockStatus::Available, 0);

        Self {
            sku: sku.into(),
            stock_level: StockLevel::zero(),
            stock_status_quantity,
            holds: Vec::new(),
            lot_batches: Vec::new(),
            abc_classification: None,
            valuation: None,
            version: 0,
            last_updated: Utc::now(),
            pending_events: Vec::new(),
        }
    }

    /// `atp = stockStatusQuantity[AVAILABLE] − quantityAllocated − Σ active hold quantities`,
    /// floored at 0 (spec §4.1).
    pub fn available_to_promise(&self) -> i64 {
        let available_bucket = self.stock_status_quantity.get(&StockStatus::Available).copied().unwrap_or(0);
        let held: i64 = self
            .holds
            .iter()
            .filter(|hold| hold.is_effective(Utc::now()))
            .map(|hold| hold.quantity)
            .sum();
        (available_bucket - self.stock_level.quantity_allocated - held).max(0)
    }

    fn snapshot(&self) -> StockLevelSnapshot {
        StockLevelSnapshot {
            quantity_on_hand: self.stock_level.quantity_on_hand,
            quantity_allocated: self.stock_level.quantity_allocated,
            available_to_promise: self.available_to_promise(),
        }
    }

    /// Checks I1–I6. Called at the end of every mutation before the event
    /// is appended; on failure the caller must discard the mutation.
    fn check_invariants(&self) -> Result<()> {
        let level = &self.stock_level;
        if level.quantity_allocated > level.quantity_on_hand {
            return Err(LedgerError::InvariantViolation(format!(
                "quantity_allocated ({}) exceeds quantity_on_hand ({}) for {}",
                level.quantity_allocated, level.quantity_on_hand, self.sku
            )));
        }
        if level.quantity_on_hand < 0 || level.quantity_allocated < 0 {
            return Err(LedgerError::InvariantViolation(format!(
                "negative stock level for {}",
                self.sku
            )));
        }
        let status_sum: i64 = self.stock_status_quantity.values().sum();
        if status_sum != level.quantity_on_hand {
            return Err(LedgerError::InvariantViolation(format!(
                "status bucket sum ({}) does not equal quantity_on_hand ({}) for {}",
                status_sum, level.quantity_on_hand, self.sku
            )));
        }
        let lot_total: i64 = self.lot_batches.iter().map(|lot| lot.quantity).sum();
        if !self.lot_batches.is_empty() && lot_total > level.quantity_on_hand {
            return Err(LedgerError::InvariantViolation(format!(
                "lot total ({}) exceeds quantity_on_hand ({}) for {}",
                lot_total, level.quantity_on_hand, self.sku
            )));
        }
        for lot in &self.lot_batches {
            if lot.allocated_quantity > lot.quantity {
                return Err(LedgerError::InvariantViolation(format!(
                    "lot {} over-allocated for {}",
                    lot.lot_number, self.sku
                )));
            }
        }
        Ok(())
    }

    fn push_level_changed(&mut self, previous: StockLevelSnapshot, reason: ReasonCode) {
        self.pending_events.push(DomainEvent::StockLevelChanged {
            header: EventHeader::new(self.sku.clone()),
            payload: StockLevelChangedPayload {
                sku: self.sku.clone(),
                previous_stock_level: previous,
                new_stock_level: self.snapshot(),
                change_reason: reason,
            },
        });
    }

    /// `allocate(qty>0)` — requires `qty ≤ available_to_promise`.
    pub fn allocate(&mut self, qty: i64) -> Result<()> {
        if qty <= 0 {
            return Err(LedgerError::InvalidQuantity(format!("allocate qty must be positive, got {qty}")));
        }
        let available = self.available_to_promise();
        if qty > available {
            return Err(LedgerError::InsufficientStock { available, requested: qty });
        }
        let previous = self.snapshot();
        self.stock_level.quantity_allocated += qty;
        self.check_invariants()?;
        self.push_level_changed(previous, ReasonCode::Allocation);
        self.touch();
        Ok(())
    }

    /// `deallocate(qty>0)` — requires `qty ≤ quantityAllocated`.
    pub fn deallocate(&mut self, qty: i64) -> Result<()> {
        if qty <= 0 {
            return Err(LedgerError::InvalidQuantity(format!("deallocate qty must be positive, got {qty}")));
        }
        if qty > self.stock_level.quantity_allocated {
            return Err(LedgerError::InsufficientStock {
                available: self.stock_level.quantity_allocated,
                requested: qty,
            });
        }
        let previous = self.snapshot();
        self.stock_level.quantity_allocated -= qty;
        self.check_invariants()?;
        self.push_level_changed(previous, ReasonCode::Deallocation);
        self.touch();
        Ok(())
    }

    /// `adjustQuantityOnHand(delta≠0, reason)` — applies signed delta to
    /// on-hand and the AVAILABLE bucket. Both preconditions are checked
    /// before either field is touched, so a failing adjustment never leaves
    /// the aggregate partially mutated (spec §4.1).
    pub fn adjust_quantity_on_hand(&mut self, delta: i64, reason: ReasonCode) -> Result<()> {
        if delta == 0 {
            return Err(LedgerError::InvalidQuantity("adjustment delta must be non-zero".into()));
        }
        let new_on_hand = self.stock_level.quantity_on_hand + delta;
        if new_on_hand < 0 {
            return Err(LedgerError::InvalidQuantity(format!(
                "adjustment would take on-hand negative: {new_on_hand}"
            )));
        }
        let current_bucket = self.stock_status_quantity.get(&StockStatus::Available).copied().unwrap_or(0);
        let new_bucket = current_bucket + delta;
        if new_bucket < 0 {
            return Err(LedgerError::InvalidQuantity(format!(
                "adjustment would take AVAILABLE bucket negative: {new_bucket}"
            )));
        }
        let previous = self.snapshot();
        self.stock_level.quantity_on_hand = new_on_hand;
        self.stock_status_quantity.insert(StockStatus::Available, new_bucket);
        self.check_invariants()?;
        self.push_level_changed(previous, reason);
        self.touch();
        Ok(())
    }

    /// `receiveStock(qty>0, receiptId?)` — increases on-hand and AVAILABLE.
    pub fn receive_stock(&mut self, qty: i64) -> Result<()> {
        if qty <= 0 {
            return Err(LedgerError::InvalidQuantity(format!("receipt qty must be positive, got {qty}")));
        }
        self.adjust_quantity_on_hand(qty, ReasonCode::PurchaseReceipt)
    }

    /// `receiveStockInStatus(qty>0, status, receiptId?)` — increases
    /// on-hand and the named status bucket, emitting both StockLevelChanged
    /// and StockStatusChanged.
    pub fn receive_stock_in_status(&mut self, qty: i64, status: StockStatus) -> Result<()> {
        if qty <= 0 {
            return Err(LedgerError::InvalidQuantity(format!("receipt qty must be positive, got {qty}")));
        }
        let previous = self.snapshot();
        self.stock_level.quantity_on_hand += qty;
        *self.stock_status_quantity.entry(status).or_insert(0) += qty;
        self.check_invariants()?;
        self.push_level_changed(previous, ReasonCode::PurchaseReceipt);
        self.pending_events.push(DomainEvent::StockStatusChanged {
            header: EventHeader::new(self.sku.clone()),
            payload: StockStatusChangedPayload {
                sku: self.sku.clone(),
                previous_status: "NONE".to_string(),
                new_status: format!("{status:?}"),
                quantity: qty,
                reason: "STOCK_RECEIPT".to_string(),
                lot_number: None,
            },
        });
        self.touch();
        Ok(())
    }

    /// `addLot(lotNumber, manufactureDate, expiryDate?, qty>0)` — receives
    /// `qty` into a new lot, increasing on-hand and the AVAILABLE bucket by
    /// the same amount. Requires `lotNumber` unique within the set (I6).
    pub fn add_lot(
        &mut self,
        lot_number: impl Into<String>,
        manufacture_date: DateTime<Utc>,
        expiry_date: Option<DateTime<Utc>>,
        qty: i64,
    ) -> Result<()> {
        if qty <= 0 {
            return Err(LedgerError::InvalidQuantity(format!("lot quantity must be positive, got {qty}")));
        }
        let lot_number = lot_number.into();
        if self.lot_batches.iter().any(|lot| lot.lot_number == lot_number) {
            return Err(LedgerError::InvalidQuantity(format!("lot {lot_number} already exists for {}", self.sku)));
        }
        let previous = self.snapshot();
        self.stock_level.quantity_on_hand += qty;
        *self.stock_status_quantity.entry(StockStatus::Available).or_insert(0) += qty;
        self.lot_batches.push(LotBatch {
            lot_number: lot_number.clone(),
            manufacture_date,
            expiry_date,
            status: LotStatus::Active,
            quantity: qty,
            allocated_quantity: 0,
        });
        self.check_invariants()?;
        self.push_level_changed(previous, ReasonCode::PurchaseReceipt);
        self.pending_events.push(DomainEvent::StockStatusChanged {
            header: EventHeader::new(self.sku.clone()),
            payload: StockStatusChangedPayload {
                sku: self.sku.clone(),
                previous_status: "NONE".to_string(),
                new_status: format!("{:?}", LotStatus::Active),
                quantity: qty,
                reason: "LOT_RECEIVED".to_string(),
                lot_number: Some(lot_number),
            },
        });
        self.touch();
        Ok(())
    }

    /// `allocateLot(lotNumber, qty>0)` — requires the lot exists and
    /// `allocatedQuantity + qty ≤ quantity` (I6).
    pub fn allocate_lot(&mut self, lot_number: &str, qty: i64) -> Result<()> {
        if qty <= 0 {
            return Err(LedgerError::InvalidQuantity(format!("lot allocation qty must be positive, got {qty}")));
        }
        let lot = self
            .lot_batches
            .iter_mut()
            .find(|lot| lot.lot_number == lot_number)
            .ok_or_else(|| LedgerError::InvalidQuantity(format!("lot {lot_number} not found for {}", self.sku)))?;
        let remaining = lot.quantity - lot.allocated_quantity;
        if qty > remaining {
            return Err(LedgerError::InsufficientStock { available: remaining, requested: qty });
        }
        lot.allocated_quantity += qty;
        self.check_invariants()?;
        self.pending_events.push(DomainEvent::StockStatusChanged {
            header: EventHeader::new(self.sku.clone()),
            payload: StockStatusChangedPayload {
                sku: self.sku.clone(),
                previous_status: format!("{:?}", LotStatus::Active),
                new_status: format!("{:?}", LotStatus::Active),
                quantity: qty,
                reason: "LOT_ALLOCATED".to_string(),
                lot_number: Some(lot_number.to_string()),
            },
        });
        self.touch();
        Ok(())
    }

    /// `releaseLot(lotNumber, qty>0)` — requires `qty ≤ allocatedQuantity`.
    pub fn release_lot(&mut self, lot_number: &str, qty: i64) -> Result<()> {
        if qty <= 0 {
            return Err(LedgerError::InvalidQuantity(format!("lot release qty must be positive, got {qty}")));
        }
        let lot = self
            .lot_batches
            .iter_mut()
            .find(|lot| lot.lot_number == lot_number)
            .ok_or_else(|| LedgerError::InvalidQuantity(format!("lot {lot_number} not found for {}", self.sku)))?;
        if qty > lot.allocated_quantity {
            return Err(LedgerError::InsufficientStock { available: lot.allocated_quantity, requested: qty });
        }
        lot.allocated_quantity -= qty;
        self.check_invariants()?;
        self.pending_events.push(DomainEvent::StockStatusChanged {
            header: EventHeader::new(self.sku.clone()),
            payload: StockStatusChangedPayload {
                sku: self.sku.clone(),
                previous_status: format!("{:?}", LotStatus::Active),
                new_status: format!("{:?}", LotStatus::Active),
                quantity: qty,
                reason: "LOT_RELEASED".to_string(),
                lot_number: Some(lot_number.to_string()),
            },
        });
        self.touch();
        Ok(())
    }

    /// `expireLot(lotNumber)` — marks a lot `EXPIRED`; quantities are left in
    /// place for recall/disposal accounting, not removed from the set.
    pub fn expire_lot(&mut self, lot_number: &str) -> Result<()> {
        let lot = self
            .lot_batches
            .iter_mut()
            .find(|lot| lot.lot_number == lot_number)
            .ok_or_else(|| LedgerError::InvalidQuantity(format!("lot {lot_number} not found for {}", self.sku)))?;
        if lot.status == LotStatus::Expired {
            return Err(LedgerError::InvalidQuantity(format!("lot {lot_number} already expired")));
        }
        let previous_status = lot.status;
        let quantity = lot.quantity;
        lot.status = LotStatus::Expired;
        self.check_invariants()?;
        self.pending_events.push(DomainEvent::StockStatusChanged {
            header: EventHeader::new(self.sku.clone()),
            payload: StockStatusChangedPayload {
                sku: self.sku.clone(),
                previous_status: format!("{previous_status:?}"),
                new_status: format!("{:?}", LotStatus::Expired),
                quantity,
                reason: "LOT_EXPIRED".to_string(),
                lot_number: Some(lot_number.to_string()),
            },
        });
        self.touch();
        Ok(())
    }

    /// `processPick(qty>0, orderId)` — deallocate + on-hand decrement as one
    /// atomic operation producing a single event sequence, never leaving an
    /// intermediate invariant-violating state observable.
    pub fn process_pick(&mut self, qty: i64) -> Result<()> {
        if qty <= 0 {
            return Err(LedgerError::InvalidQuantity(format!("pick qty must be positive, got {qty}")));
        }
        if qty > self.stock_level.quantity_allocated {
            return Err(LedgerError::InsufficientStock {
                available: self.stock_level.quantity_allocated,
                requested: qty,
            });
        }
        let new_on_hand = self.stock_level.quantity_on_hand - qty;
        if new_on_hand < 0 {
            return Err(LedgerError::InvariantViolation("pick would take on-hand negative".into()));
        }
        let previous = self.snapshot();
        self.stock_level.quantity_allocated -= qty;
        self.stock_level.quantity_on_hand = new_on_hand;
        let bucket = self.stock_status_quantity.entry(StockStatus::Available).or_insert(0);
        *bucket -= qty;
        self.check_invariants()?;
        self.push_level_changed(previous, ReasonCode::ItemPicked);
        self.touch();
        Ok(())
    }

    /// `changeStockStatus(from, to, qty>0, reason, lotNumber?)`.
    pub fn change_stock_status(
        &mut self,
        from: StockStatus,
        to: StockStatus,
        qty: i64,
        reason: impl Into<String>,
        lot_number: Option<String>,
    ) -> Result<()> {
        if qty <= 0 {
            return Err(LedgerError::InvalidQuantity(format!("status change qty must be positive, got {qty}")));
        }
        if from == to {
            return Err(LedgerError::InvalidQuantity("from and to status must differ".into()));
        }
        let from_qty = self.stock_status_quantity.get(&from).copied().unwrap_or(0);
        if from_qty < qty {
            return Err(LedgerError::InsufficientStock { available: from_qty, requested: qty });
        }
        *self.stock_status_quantity.get_mut(&from).unwrap() -= qty;
        *self.stock_status_quantity.entry(to).or_insert(0) += qty;
        self.check_invariants()?;
        self.pending_events.push(DomainEvent::StockStatusChanged {
            header: EventHeader::new(self.sku.clone()),
            payload: StockStatusChangedPayload {
                sku: self.sku.clone(),
                previous_status: format!("{from:?}"),
                new_status: format!("{to:?}"),
                quantity: qty,
                reason: reason.into(),
                lot_number,
            },
        });
        self.touch();
        Ok(())
    }

    /// `placeHold(holdType, qty>0, reason, placedBy, expiresAt?)` —
    /// requires `qty ≤ available_to_promise` (post-hold).
    pub fn place_hold(
        &mut self,
        hold_type: HoldType,
        qty: i64,
        reason: impl Into<String>,
        placed_by: impl Into<String>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<Uuid> {
        if qty <= 0 {
            return Err(LedgerError::InvalidQuantity(format!("hold qty must be positive, got {qty}")));
        }
        let available = self.available_to_promise();
        if qty > available {
            return Err(LedgerError::InsufficientStock { available, requested: qty });
        }
        let hold_id = Uuid::new_v4();
        let reason = reason.into();
        self.holds.push(InventoryHold {
            hold_id,
            hold_type,
            quantity: qty,
            reason: reason.clone(),
            placed_by: placed_by.into(),
            placed_at: Utc::now(),
            expires_at,
            lot_number: None,
            active: true,
        });
        self.check_invariants()?;
        self.pending_events.push(DomainEvent::InventoryHoldPlaced {
            header: EventHeader::new(self.sku.clone()),
            payload: InventoryHoldPlacedPayload {
                sku: self.sku.clone(),
                hold_id,
                hold_type,
                quantity_on_hold: qty,
                reason,
            },
        });
        self.touch();
        Ok(hold_id)
    }

    /// `releaseHold(holdId, releasedBy)` — requires the hold exists and is
    /// currently active.
    pub fn release_hold(&mut self, hold_id: Uuid, released_by: impl Into<String>) -> Result<()> {
        let _ = released_by.into();
        let hold = self
            .holds
            .iter_mut()
            .find(|hold| hold.hold_id == hold_id && hold.active)
            .ok_or_else(|| LedgerError::InvalidQuantity(format!("no active hold {hold_id} for {}", self.sku)))?;
        hold.active = false;
        let quantity_released = hold.quantity;
        let hold_type = hold.hold_type;
        let reason = hold.reason.clone();
        self.pending_events.push(DomainEvent::InventoryHoldReleased {
            header: EventHeader::new(self.sku.clone()),
            payload: InventoryHoldReleasedPayload {
                sku: self.sku.clone(),
                hold_id,
                hold_type,
                quantity_released,
                reason,
            },
        });
        self.touch();
        Ok(())
    }

    /// Updates the valuation snapshot, emitting `InventoryValuationChanged`.
    pub fn revalue(&mut self, method: ValuationMethod, new_unit_cost: Decimal, currency: impl Into<String>, reason: impl Into<String>) -> Result<()> {
        let previous_unit_cost = self.valuation.as_ref().map(|v| v.unit_cost).unwrap_or(Decimal::ZERO);
        let previous_total_value = self.valuation.as_ref().map(|v| v.total_value).unwrap_or(Decimal::ZERO);
        let quantity = self.stock_level.quantity_on_hand;
        let new_total_value = new_unit_cost * Decimal::from(quantity);

        self.valuation = Some(InventoryValuation {
            method,
            unit_cost: new_unit_cost,
            total_value: new_total_value,
            currency: currency.into(),
            cost_layers: None,
        });

        let reason = reason.into();
        self.pending_events.push(DomainEvent::InventoryValuationChanged {
            header: EventHeader::new(self.sku.clone()),
            payload: InventoryValuationChangedPayload {
                sku: self.sku.clone(),
                valuation_method: method,
                previous_unit_cost,
                new_unit_cost,
                previous_total_value,
                new_total_value,
                quantity,
                reason,
            },
        });
        self.touch();
        Ok(())
    }

    /// Updates the ABC classification, emitting `AbcClassificationChanged`.
    pub fn reclassify(&mut self, new_class: AbcClass, criteria: impl Into<String>, annual_usage_value: Decimal, reason: impl Into<String>) -> Result<()> {
        let previous_class = self.abc_classification.as_ref().map(|c| c.class);
        let criteria = criteria.into();
        self.abc_classification = Some(AbcClassification {
            class: new_class,
            criteria: criteria.clone(),
            annual_usage_value,
            classified_at: Utc::now(),
            valid_until: None,
        });
        self.pending_events.push(DomainEvent::AbcClassificationChanged {
            header: EventHeader::new(self.sku.clone()),
            payload: AbcClassificationChangedPayload {
                sku: self.sku.clone(),
                previous_class,
                new_class,
                criteria,
                reason: reason.into(),
            },
        });
        self.touch();
        Ok(())
    }

    fn touch(&mut self) {
        self.last_updated = Utc::now();
    }

    /// Called by the command service after a successful atomic persist.
    pub fn take_pending_events(&mut self) -> Vec<DomainEvent> {
        std::mem::take(&mut self.pending_events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stock_with(on_hand: i64, allocated: i64) -> ProductStock {
        let mut stock = ProductStock::create("SKU-A");
        stock.receive_stock(on_hand).unwrap();
        if allocated > 0 {
            stock.allocate(allocated).unwrap();
        }
        stock
    }

    #[test]
    fn receipt_then_query_scenario_1() {
        let mut stock = ProductStock::create("SKU-A");
        stock.adjust_quantity_on_hand(100, ReasonCode::PurchaseReceipt).unwrap();
        assert_eq!(stock.stock_level.quantity_on_hand, 100);
        assert_eq!(stock.stock_level.quantity_allocated, 0);
        assert_eq!(stock.available_to_promise(), 100);
        assert_eq!(stock.pending_events.len(), 1);
        match &stock.pending_events[0] {
            DomainEvent::StockLevelChanged { payload, .. } => {
                assert_eq!(payload.previous_stock_level.quantity_on_hand, 0);
                assert_eq!(payload.new_stock_level.quantity_on_hand, 100);
                assert_eq!(payload.change_reason, ReasonCode::PurchaseReceipt);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn reservation_path_scenario_2() {
        let mut stock = stock_with(500, 150);
        stock.allocate(10).unwrap();
        assert_eq!(stock.stock_level.quantity_on_hand, 500);
        assert_eq!(stock.stock_level.quantity_allocated, 160);
        assert_eq!(stock.available_to_promise(), 340);
    }

    #[test]
    fn allocate_exact_available_then_one_more_fails() {
        let mut stock = stock_with(100, 0);
        stock.allocate(100).unwrap();
        assert_eq!(stock.available_to_promise(), 0);
        let err = stock.allocate(1).unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientStock { .. }));
    }

    #[test]
    fn allocate_then_deallocate_restores_level_p2() {
        let mut stock = stock_with(100, 0);
        stock.allocate(20).unwrap();
        stock.deallocate(20).unwrap();
        assert_eq!(stock.stock_level.quantity_allocated, 0);
        assert_eq!(stock.pending_events.len(), 2);
        assert!(matches!(stock.pending_events[0], DomainEvent::StockLevelChanged { .. }));
        assert!(matches!(stock.pending_events[1], DomainEvent::StockLevelChanged { .. }));
    }

    #[test]
    fn pick_decrements_both_scenario_4() {
        let mut stock = stock_with(100, 30);
        stock.process_pick(30).unwrap();
        assert_eq!(stock.stock_level.quantity_on_hand, 70);
        assert_eq!(stock.stock_level.quantity_allocated, 0);
        assert_eq!(stock.available_to_promise(), 70);
    }

    #[test]
    fn status_and_hold_interplay_scenario_5() {
        let mut stock = stock_with(100, 0);
        stock
            .change_stock_status(StockStatus::Available, StockStatus::Quarantine, 30, "inspection", None)
            .unwrap();
        let hold_id = stock
            .place_hold(HoldType::Administrative, 20, "legal review", "operator-1", None)
            .unwrap();
        assert_eq!(stock.available_to_promise(), 50);
        stock.release_hold(hold_id, "operator-1").unwrap();
        assert_eq!(stock.available_to_promise(), 70);
    }

    #[test]
    fn invalid_quantity_never_mutates_state() {
        let mut stock = stock_with(100, 0);
        let before = stock.stock_level;
        let err = stock.allocate(0).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidQuantity(_)));
        assert_eq!(stock.stock_level, before);
        assert!(stock.pending_events.is_empty());
    }

    #[test]
    fn adjust_negative_full_on_hand_then_receipt_restores() {
        let mut stock = stock_with(50, 0);
        stock.adjust_quantity_on_hand(-50, ReasonCode::CycleCount).unwrap();
        assert_eq!(stock.stock_level.quantity_on_hand, 0);
        assert_eq!(stock.available_to_promise(), 0);
        stock.receive_stock(25).unwrap();
        assert_eq!(stock.available_to_promise(), 25);
    }

    #[test]
    fn adjust_quantity_on_hand_rejects_available_bucket_underflow_without_mutating() {
        let mut stock = stock_with(100, 0);
        stock
            .change_stock_status(StockStatus::Available, StockStatus::Quarantine, 80, "inspection", None)
            .unwrap();
        let before_level = stock.stock_level;
        let before_buckets = stock.stock_status_quantity.clone();
        let err = stock.adjust_quantity_on_hand(-30, ReasonCode::CycleCount).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidQuantity(_)));
        assert_eq!(stock.stock_level, before_level);
        assert_eq!(stock.stock_status_quantity, before_buckets);
    }

    #[test]
    fn lot_lifecycle_add_allocate_release_expire() {
        let mut stock = ProductStock::create("SKU-A");
        stock.add_lot("LOT-1", Utc::now(), None, 50).unwrap();
        assert_eq!(stock.stock_level.quantity_on_hand, 50);
        assert_eq!(stock.lot_batches[0].quantity, 50);

        stock.allocate_lot("LOT-1", 20).unwrap();
        assert_eq!(stock.lot_batches[0].allocated_quantity, 20);

        let err = stock.allocate_lot("LOT-1", 40).unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientStock { .. }));

        stock.release_lot("LOT-1", 5).unwrap();
        assert_eq!(stock.lot_batches[0].allocated_quantity, 15);

        stock.expire_lot("LOT-1").unwrap();
        assert_eq!(stock.lot_batches[0].status, LotStatus::Expired);
        assert!(stock.expire_lot("LOT-1").is_err());
    }

    #[test]
    fn add_lot_rejects_duplicate_lot_number() {
        let mut stock = ProductStock::create("SKU-A");
        stock.add_lot("LOT-1", Utc::now(), None, 10).unwrap();
        let err = stock.add_lot("LOT-1", Utc::now(), None, 5).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidQuantity(_)));
    }

    #[test]
    fn expired_hold_excluded_from_atp() {
        let mut stock = stock_with(100, 0);
        let hold_id = stock
            .place_hold(
                HoldType::Administrative,
                10,
                "temp",
                "operator-1",
                Some(Utc::now() - chrono::Duration::seconds(1)),
            )
            .unwrap();
        assert_eq!(stock.available_to_promise(), 100);
        assert!(stock.holds.iter().find(|h| h.hold_id == hold_id).is_some());
    }
}
