// ============================================================================
// OLYMPUS CLOUD - INVENTORY LEDGER
// ============================================================================
// Module: ledger/src/outbox/record.rs
// Description: OutboxEvent (C5) — persistable envelope for a pending
//              external event. Created in the same transaction as its
//              aggregate's state change; mutated only by the publisher to
//              set `published`/`retry_count`.
// ============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::DomainEvent;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboxEvent {
    pub id: Uuid,
    pub aggregate_id: String,
    pub event_type: String,
    pub event_data: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub published: bool,
    pub published_at: Option<DateTime<Utc>>,
    pub retry_count: u32,
}

impl OutboxEvent {
    pub fn from_domain_event(event: &DomainEvent) -> serde_json::Result<Self> {
        Ok(Self {
            id: Uuid::new_v4(),
            aggregate_id: event.header().aggregate_id.clone(),
            event_type: event.event_type().to_string(),
            event_data: event.payload_json()?,
            created_at: event.header().occurred_on,
            published: false,
            published_at: None,
            retry_count: 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EventHeader, ReasonCode};
    use crate::domain::events::{StockLevelChangedPayload, StockLevelSnapshot};

    #[test]
    fn outbox_row_created_per_pending_event() {
        let event = DomainEvent::StockLevelChanged {
            header: EventHeader::new("SKU-1"),
            payload: StockLevelChangedPayload {
                sku: "SKU-1".into(),
                previous_stock_level: StockLevelSnapshot { quantity_on_hand: 0, quantity_allocated: 0, available_to_promise: 0 },
                new_stock_level: StockLevelSnapshot { quantity_on_hand: 10, quantity_allocated: 0, available_to_promise: 10 },
                change_reason: ReasonCode::PurchaseReceipt,
            },
        };
        let row = OutboxEvent::from_domain_event(&event).unwrap();
        assert_eq!(row.aggregate_id, "SKU-1");
        assert!(!row.published);
        assert_eq!(row.retry_count, 0);
    }
}
