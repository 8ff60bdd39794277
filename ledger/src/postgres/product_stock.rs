// ============================================================================
// OLYMPUS CLOUD - INVENTORY LEDGER
// ============================================================================
// Module: ledger/src/postgres/product_stock.rs
// Description: Postgres-backed ProductStockRepository. `product_stocks` is
//              keyed by sku and stores the full aggregate document as JSONB
//              (spec §6.3); `version` is a dedicated column so the CAS
//              compare-and-swap is a single indexed `UPDATE ... WHERE`.
// ============================================================================

use async_trait::async_trait;
use sqlx::{PgPool, Row};

use crate::domain::{InventoryLedgerEntry, ProductStock};
use crate::error::{LedgerError, Result};
use crate::outbox::OutboxEvent;
use crate::repository::ProductStockRepository;

pub struct PgProductStockRepository {
    pool: PgPool,
}

impl PgProductStockRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProductStockRepository for PgProductStockRepository {
    async fn find(&self, sku: &str) -> Result<Option<ProductStock>> {
        let row = sqlx::query("SELECT document FROM product_stocks WHERE sku = $1")
            .bind(sku)
            .fetch_optional(&self.pool)
            .await
            .map_err(|err| LedgerError::Repository(err.into()))?;

        match row {
            Some(row) => {
                let document: serde_json::Value = row.get("document");
                let stock: ProductStock = serde_json::from_value(document)
                    .map_err(|err| LedgerError::SchemaValidation(err.to_string()))?;
                Ok(Some(stock))
            }
            None => Ok(None),
        }
    }

    /// Writes the aggregate, its ledger entry, and its outbox rows inside
    /// one transaction. The aggregate upsert is conditioned on
    /// `expected_version` so a concurrent writer's commit makes this one a
    /// no-op row update (zero rows affected), reported back as `Ok(false)`
    /// rather than surfaced as an error (spec §4.2 step 5).
    async fn save(
        &self,
        stock: &ProductStock,
        expected_version: i64,
        ledger_entry: Option<&InventoryLedgerEntry>,
        outbox_rows: &[OutboxEvent],
    ) -> Result<bool> {
        let mut tx = self.pool.begin().await.map_err(|err| LedgerError::Repository(err.into()))?;

        let document = serde_json::to_value(stock).map_err(|err| LedgerError::SchemaValidation(err.to_string()))?;
        let new_version = expected_version + 1;

        let result = if expected_version == 0 {
            sqlx::query(
                "INSERT INTO product_stocks (sku, document, version) VALUES ($1, $2, $3)
                 ON CONFLICT (sku) DO NOTHING",
            )
            .bind(&stock.sku)
            .bind(&document)
            .bind(new_version)
            .execute(&mut *tx)
            .await
        } else {
            sqlx::query(
                "UPDATE product_stocks SET document = $1, version = $2
                 WHERE sku = $3 AND version = $4",
            )
            .bind(&document)
            .bind(new_version)
            .bind(&stock.sku)
            .bind(expected_version)
            .execute(&mut *tx)
            .await
        }
        .map_err(|err| LedgerError::Repository(err.into()))?;

        if result.rows_affected() == 0 {
            tx.rollback().await.map_err(|err| LedgerError::Repository(err.into()))?;
            return Ok(false);
        }

        if let Some(entry) = ledger_entry {
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
            .execute(&mut *tx)
            .await
            .map_err(|err| LedgerError::Repository(err.into()))?;
        }

        for row in outbox_rows {
            sqlx::query(
                "INSERT INTO outbox_events
                    (id, aggregate_id, event_type, payload, created_at, published)
                 VALUES ($1, $2, $3, $4, $5, false)",
            )
            .bind(row.id)
            .bind(&row.aggregate_id)
            .bind(&row.event_type)
            .bind(&row.event_data)
            .bind(row.created_at)
            .execute(&mut *tx)
            .await
            .map_err(|err| LedgerError::Repository(err.into()))?;
        }

        tx.commit().await.map_err(|err| LedgerError::Repository(err.into()))?;
        Ok(true)
    }

    async fn list_all(&self) -> Result<Vec<ProductStock>> {
        let rows = sqlx::query("SELECT document FROM product_stocks")
            .fetch_all(&self.pool)
            .await
            .map_err(|err| LedgerError::Repository(err.into()))?;

        rows.into_iter()
            .map(|row| {
                let document: serde_json::Value = row.get("document");
                serde_json::from_value(document).map_err(|err| LedgerError::SchemaValidation(err.to_string()))
            })
            .collect()
    }
}
