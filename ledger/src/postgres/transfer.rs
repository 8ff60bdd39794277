// ============================================================================
// OLYMPUS CLOUD - INVENTORY LEDGER
// ============================================================================
// Module: ledger/src/postgres/transfer.rs
// Description: Postgres-backed TransferRepository, storing each
//              StockTransfer as a JSONB document keyed by transfer_id.
// ============================================================================

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::domain::StockTransfer;
use crate::error::{LedgerError, Result};
use crate::repository::TransferRepository;

pub struct PgTransferRepository {
    pool: PgPool,
}

impl PgTransferRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TransferRepository for PgTransferRepository {
    async fn find(&self, transfer_id: Uuid) -> Result<Option<StockTransfer>> {
        let row = sqlx::query("SELECT document FROM stock_transfers WHERE transfer_id = $1")
            .bind(transfer_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|err| LedgerError::Repository(err.into()))?;

        match row {
            Some(row) => {
                let document: serde_json::Value = row.get("document");
                Ok(Some(serde_json::from_value(document).map_err(|err| LedgerError::SchemaValidation(err.to_string()))?))
            }
            None => Ok(None),
        }
    }

    async fn save(&self, transfer: &StockTransfer) -> Result<()> {
        let document = serde_json::to_value(transfer).map_err(|err| LedgerError::SchemaValidation(err.to_string()))?;
        sqlx::query(
            "INSERT INTO stock_transfers (transfer_id, document) VALUES ($1, $2)
             ON CONFLICT (transfer_id) DO UPDATE SET document = EXCLUDED.document",
        )
        .bind(transfer.transfer_id)
        .bind(&document)
        .execute(&self.pool)
        .await
        .map_err(|err| LedgerError::Repository(err.into()))?;
        Ok(())
    }
}
