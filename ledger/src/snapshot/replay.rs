// ============================================================================
// OLYMPUS CLOUD - INVENTORY LEDGER
// ============================================================================
// Module: ledger/src/snapshot/replay.rs
// Description: Pure event replay (spec §4.5). No I/O, no wall-clock or
//              randomness: given the same baseline, event slice, and target
//              time, `replay` must return bitwise-identical output (P5).
// ============================================================================

use chrono::{DateTime, Utc};

use crate::domain::events::DomainEvent;
use crate::domain::value_objects::StockStatus;

use super::InventorySnapshot;

/// Folds `events` onto `baseline.state`, selecting only events for the same
/// SKU with `baseline.snapshot_timestamp < occurred_on ≤ target_time`,
/// sorted by `(occurred_on, event_id)`. Unknown variants are skipped (there
/// are none in this closed enum, but the match is written to make that
/// explicit if the event set grows).
pub fn replay(baseline: &InventorySnapshot, events: &[DomainEvent], target_time: DateTime<Utc>) -> InventorySnapshot {
    let mut projection = baseline.state.clone();
    projection.pending_events.clear();

    let mut relevant: Vec<&DomainEvent> = events
        .iter()
        .filter(|event| {
            event.header().aggregate_id == baseline.sku
                && event.header().occurred_on > baseline.snapshot_timestamp
                && event.header().occurred_on <= target_time
        })
        .collect();
    relevant.sort_by_key(|event| (event.header().occurred_on, event.header().event_id));

    for event in relevant {
        apply_event(&mut projection, event);
    }

    let mut result = baseline.clone();
    result.state = projection;
    result.snapshot_timestamp = target_time;
    result.reason = Some("replay".to_string());
    result
}

fn apply_event(projection: &mut crate::domain::ProductStock, event: &DomainEvent) {
    match event {
        DomainEvent::StockLevelChanged { payload, .. } => {
            projection.stock_level.quantity_on_hand = payload.new_stock_level.quantity_on_hand;
            projection.stock_level.quantity_allocated = payload.new_stock_level.quantity_allocated;
        }
        DomainEvent::StockStatusChanged { payload, .. } => {
            if let (Some(from), Some(to)) = (parse_status(&payload.previous_status), parse_status(&payload.new_status)) {
                let from_qty = projection.stock_status_quantity.entry(from).or_insert(0);
                *from_qty = (*from_qty - payload.quantity).max(0);
                *projection.stock_status_quantity.entry(to).or_insert(0) += payload.quantity;
            }
        }
        DomainEvent::InventoryHoldPlaced { payload, .. } => {
            projection.holds.push(crate::domain::InventoryHold {
                hold_id: payload.hold_id,
                hold_type: payload.hold_type,
                quantity: payload.quantity_on_hold,
                reason: payload.reason.clone(),
                placed_by: "replay".to_string(),
                placed_at: event.header().occurred_on,
                expires_at: None,
                lot_number: None,
                active: true,
            });
        }
        DomainEvent::InventoryHoldReleased { payload, .. } => {
            if let Some(hold) = projection.holds.iter_mut().find(|hold| hold.hold_id == payload.hold_id) {
                hold.active = false;
            }
        }
        DomainEvent::InventoryValuationChanged { payload, .. } => {
            projection.valuation = Some(crate::domain::InventoryValuation {
                method: payload.valuation_method,
                unit_cost: payload.new_unit_cost,
                total_value: payload.new_total_value,
                currency: "USD".to_string(),
                cost_layers: None,
            });
        }
        DomainEvent::AbcClassificationChanged { payload, .. } => {
            projection.abc_classification = Some(crate::domain::AbcClassification {
                class: payload.new_class,
                criteria: payload.criteria.clone(),
                annual_usage_value: rust_decimal::Decimal::ZERO,
                classified_at: event.header().occurred_on,
                valid_until: None,
            });
        }
        // Transfer, serial-number, and snapshot events don't affect
        // ProductStock state directly; they're recorded on their own
        // aggregates.
        DomainEvent::StockTransferInitiated { .. }
        | DomainEvent::StockTransferCompleted { .. }
        | DomainEvent::SerialNumberReceived { .. }
        | DomainEvent::SerialNumberAllocated { .. }
        | DomainEvent::SerialNumberShipped { .. }
        | DomainEvent::InventorySnapshotCreated { .. } => {}
    }
    projection.version += 1;
}

fn parse_status(label: &str) -> Option<StockStatus> {
    StockStatus::ALL.into_iter().find(|status| format!("{status:?}") == label)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::events::{EventHeader, StockLevelChangedPayload, StockLevelSnapshot};
    use crate::domain::{ProductStock, ReasonCode};
    use crate::snapshot::SnapshotType;

    fn baseline() -> InventorySnapshot {
        let stock = ProductStock::create("SKU-A");
        InventorySnapshot::capture(&stock, SnapshotType::OnDemand, None, None)
    }

    fn level_changed(sku: &str, occurred_on: DateTime<Utc>, new_on_hand: i64) -> DomainEvent {
        DomainEvent::StockLevelChanged {
            header: EventHeader {
                event_id: uuid::Uuid::new_v4(),
                aggregate_id: sku.to_string(),
                occurred_on,
            },
            payload: StockLevelChangedPayload {
                sku: sku.to_string(),
                previous_stock_level: StockLevelSnapshot { quantity_on_hand: 0, quantity_allocated: 0, available_to_promise: 0 },
                new_stock_level: StockLevelSnapshot { quantity_on_hand: new_on_hand, quantity_allocated: 0, available_to_promise: new_on_hand },
                change_reason: ReasonCode::PurchaseReceipt,
            },
        }
    }

    #[test]
    fn replay_is_pure_and_deterministic_p5() {
        let baseline = baseline();
        let t1 = baseline.snapshot_timestamp + chrono::Duration::seconds(10);
        let events = vec![level_changed("SKU-A", t1, 100)];
        let target = t1 + chrono::Duration::seconds(1);

        let result_a = replay(&baseline, &events, target);
        let result_b = replay(&baseline, &events, target);

        assert_eq!(result_a.state.stock_level.quantity_on_hand, 100);
        assert_eq!(
            serde_json::to_string(&result_a.state).unwrap(),
            serde_json::to_string(&result_b.state).unwrap()
        );
    }

    #[test]
    fn replay_excludes_events_after_target_time() {
        let baseline = baseline();
        let t1 = baseline.snapshot_timestamp + chrono::Duration::seconds(10);
        let t2 = baseline.snapshot_timestamp + chrono::Duration::seconds(20);
        let events = vec![level_changed("SKU-A", t1, 100), level_changed("SKU-A", t2, 200)];

        let result = replay(&baseline, &events, t1);
        assert_eq!(result.state.stock_level.quantity_on_hand, 100);
    }
}
