// ============================================================================
// OLYMPUS CLOUD - INVENTORY LEDGER
// ============================================================================
// Module: ledger/src/snapshot/mod.rs
// Description: Snapshot production and pure event replay (C10).
// ============================================================================

mod replay;

pub use replay::replay;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::ProductStock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SnapshotType {
    Daily,
    Monthly,
    YearEnd,
    OnDemand,
}

/// Immutable, denormalized copy of all observable ProductStock state at the
/// instant of capture. Used as the baseline for replay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventorySnapshot {
    pub snapshot_id: Uuid,
    pub sku: String,
    pub snapshot_timestamp: DateTime<Utc>,
    pub snapshot_type: SnapshotType,
    pub reason: Option<String>,
    pub state: ProductStock,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl InventorySnapshot {
    pub fn capture(stock: &ProductStock, snapshot_type: SnapshotType, reason: Option<String>, created_by: Option<String>) -> Self {
        let mut state = stock.clone();
        // The snapshot is a point-in-time read model; it never carries the
        // source aggregate's transient pending-event buffer.
        state.pending_events.clear();
        Self {
            snapshot_id: Uuid::new_v4(),
            sku: stock.sku.clone(),
            snapshot_timestamp: Utc::now(),
            snapshot_type,
            reason,
            state,
            created_by,
            created_at: Utc::now(),
        }
    }
}
