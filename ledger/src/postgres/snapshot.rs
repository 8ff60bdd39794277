// ============================================================================
// OLYMPUS CLOUD - INVENTORY LEDGER
// ============================================================================
// Module: ledger/src/postgres/snapshot.rs
// Description: Postgres-backed SnapshotRepository, storing each snapshot's
//              full aggregate state as JSONB alongside its scheduling
//              metadata (spec §4.5).
// ============================================================================

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};

use crate::error::{LedgerError, Result};
use crate::repository::SnapshotRepository;
use crate::snapshot::{InventorySnapshot, SnapshotType};

pub struct PgSnapshotRepository {
    pool: PgPool,
}

impl PgSnapshotRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SnapshotRepository for PgSnapshotRepository {
    async fn save(&self, snapshot: &InventorySnapshot) -> Result<()> {
        let state = serde_json::to_value(&snapshot.state).map_err(|err| LedgerError::SchemaValidation(err.to_string()))?;
        sqlx::query(
            "INSERT INTO inventory_snapshots
                (snapshot_id, sku, snapshot_timestamp, snapshot_type, reason, state, created_by, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(snapshot.snapshot_id)
        .bind(&snapshot.sku)
        .bind(snapshot.snapshot_timestamp)
        .bind(format!("{:?}", snapshot.snapshot_type))
        .bind(&snapshot.reason)
        .bind(&state)
        .bind(&snapshot.created_by)
        .bind(snapshot.created_at)
        .execute(&self.pool)
        .await
        .map_err(|err| LedgerError::Repository(err.into()))?;
        Ok(())
    }

    async fn latest_before(&self, sku: &str, at: DateTime<Utc>) -> Result<Option<InventorySnapshot>> {
        let row = sqlx::query(
            "SELECT snapshot_id, sku, snapshot_timestamp, snapshot_type, reason, state, created_by, created_at
             FROM inventory_snapshots
             WHERE sku = $1 AND snapshot_timestamp <= $2
             ORDER BY snapshot_timestamp DESC
             LIMIT 1",
        )
        .bind(sku)
        .bind(at)
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| LedgerError::Repository(err.into()))?;

        let Some(row) = row else { return Ok(None) };
        let snapshot_type: String = row.get("snapshot_type");
        let state_json: serde_json::Value = row.get("state");
        Ok(Some(InventorySnapshot {
            snapshot_id: row.get("snapshot_id"),
            sku: row.get("sku"),
            snapshot_timestamp: row.get("snapshot_timestamp"),
            snapshot_type: parse_snapshot_type(&snapshot_type)?,
            reason: row.get("reason"),
            state: serde_json::from_value(state_json).map_err(|err| LedgerError::SchemaValidation(err.to_string()))?,
            created_by: row.get("created_by"),
            created_at: row.get("created_at"),
        }))
    }
}

fn parse_snapshot_type(value: &str) -> Result<SnapshotType> {
    match value {
        "Daily" => Ok(SnapshotType::Daily),
        "Monthly" => Ok(SnapshotType::Monthly),
        "YearEnd" => Ok(SnapshotType::YearEnd),
        "OnDemand" => Ok(SnapshotType::OnDemand),
        other => Err(LedgerError::SchemaValidation(format!("unknown snapshot_type {other}"))),
    }
}
