// ============================================================================
// OLYMPUS CLOUD - INVENTORY LEDGER
// ============================================================================
// Module: ledger/src/postgres/ledger.rs
// Description: Postgres-backed LedgerRepository. `inventory_ledger` is
//              append-only, indexed by (sku, timestamp) for history reads
//              (spec §6.3).
// ============================================================================

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};

use crate::domain::{ChangeType, InventoryLedgerEntry};
use crate::error::{LedgerError, Result};
use crate::repository::LedgerRepository;

pub struct PgLedgerRepository {
    pool: PgPool,
}

impl PgLedgerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LedgerRepository for PgLedgerRepository {
    async fn append(&self, entry: &InventoryLedgerEntry) -> Result<()> {
        sqlx::query(
            "INSERT INTO inventory_ledger
                (id, sku, quantity_change, change_type, reason, reference_id, operator_id, timestamp)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(entry.id)
        .bind(&entry.sku)
        .bind(entry.quantity_change)
        .bind(format!("{:?}", entry.change_type))
        .bind(&entry.reason)
        .bind(&entry.source_reference)
        .bind(&entry.operator_id)
        .bind(entry.timestamp)
        .execute(&self.pool)
        .await
        .map_err(|err| LedgerError::Repository(err.into()))?;
        Ok(())
    }

    async fn history_for_sku(&self, sku: &str, since: Option<DateTime<Utc>>) -> Result<Vec<InventoryLedgerEntry>> {
        let rows = sqlx::query(
            "SELECT id, sku, quantity_change, change_type, reason, reference_id, operator_id, timestamp
             FROM inventory_ledger
             WHERE sku = $1 AND timestamp >= COALESCE($2, to_timestamp(0))
             ORDER BY timestamp ASC",
        )
        .bind(sku)
        .bind(since)
        .fetch_all(&self.pool)
        .await
        .map_err(|err| LedgerError::Repository(err.into()))?;

        rows.into_iter()
            .map(|row| {
                let change_type: String = row.get("change_type");
                Ok(InventoryLedgerEntry {
                    id: row.get("id"),
                    sku: row.get("sku"),
                    timestamp: row.get("timestamp"),
                    quantity_change: row.get("quantity_change"),
                    change_type: parse_change_type(&change_type)?,
                    source_reference: row.get("reference_id"),
                    reason: row.get("reason"),
                    operator_id: row.get("operator_id"),
                })
            })
            .collect()
    }
}

fn parse_change_type(value: &str) -> Result<ChangeType> {
    match value {
        "Allocation" => Ok(ChangeType::Allocation),
        "Deallocation" => Ok(ChangeType::Deallocation),
        "Pick" => Ok(ChangeType::Pick),
        "Receipt" => Ok(ChangeType::Receipt),
        "AdjustmentPositive" => Ok(ChangeType::AdjustmentPositive),
        "AdjustmentNegative" => Ok(ChangeType::AdjustmentNegative),
        "CycleCount" => Ok(ChangeType::CycleCount),
        other => Err(LedgerError::SchemaValidation(format!("unknown change_type {other}"))),
    }
}
