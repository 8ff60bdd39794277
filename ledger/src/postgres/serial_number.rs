// ============================================================================
// OLYMPUS CLOUD - INVENTORY LEDGER
// ============================================================================
// Module: ledger/src/postgres/serial_number.rs
// Description: Postgres-backed SerialNumberRepository, storing each
//              SerialNumber as a JSONB document keyed by serial. Independent
//              of `product_stocks` — no foreign key to sku (weak reference,
//              spec §3.2).
// ============================================================================

use async_trait::async_trait;
use sqlx::{PgPool, Row};

use crate::domain::SerialNumber;
use crate::error::{LedgerError, Result};
use crate::repository::SerialNumberRepository;

pub struct PgSerialNumberRepository {
    pool: PgPool,
}

impl PgSerialNumberRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SerialNumberRepository for PgSerialNumberRepository {
    async fn find(&self, serial: &str) -> Result<Option<SerialNumber>> {
        let row = sqlx::query("SELECT document FROM serial_numbers WHERE serial = $1")
            .bind(serial)
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

    async fn save(&self, serial: &SerialNumber) -> Result<()> {
        let document = serde_json::to_value(serial).map_err(|err| LedgerError::SchemaValidation(err.to_string()))?;
        sqlx::query(
            "INSERT INTO serial_numbers (serial, sku, document) VALUES ($1, $2, $3)
             ON CONFLICT (serial) DO UPDATE SET document = EXCLUDED.document",
        )
        .bind(&serial.serial)
        .bind(&serial.sku)
        .bind(&document)
        .execute(&self.pool)
        .await
        .map_err(|err| LedgerError::Repository(err.into()))?;
        Ok(())
    }
}
