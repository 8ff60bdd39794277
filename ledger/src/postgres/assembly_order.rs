// ============================================================================
// OLYMPUS CLOUD - INVENTORY LEDGER
// ============================================================================
// Module: ledger/src/postgres/assembly_order.rs
// Description: Postgres-backed AssemblyOrderRepository, storing each
//              AssemblyOrder as a JSONB document keyed by order_id.
// ============================================================================

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::domain::AssemblyOrder;
use crate::error::{LedgerError, Result};
use crate::repository::AssemblyOrderRepository;

pub struct PgAssemblyOrderRepository {
    pool: PgPool,
}

impl PgAssemblyOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AssemblyOrderRepository for PgAssemblyOrderRepository {
    async fn find(&self, order_id: Uuid) -> Result<Option<AssemblyOrder>> {
        let row = sqlx::query("SELECT document FROM assembly_orders WHERE order_id = $1")
            .bind(order_id)
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

    async fn save(&self, order: &AssemblyOrder) -> Result<()> {
        let document = serde_json::to_value(order).map_err(|err| LedgerError::SchemaValidation(err.to_string()))?;
        sqlx::query(
            "INSERT INTO assembly_orders (order_id, document) VALUES ($1, $2)
             ON CONFLICT (order_id) DO UPDATE SET document = EXCLUDED.document",
        )
        .bind(order.order_id)
        .bind(&document)
        .execute(&self.pool)
        .await
        .map_err(|err| LedgerError::Repository(err.into()))?;
        Ok(())
    }
}
