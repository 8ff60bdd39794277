// ============================================================================
// OLYMPUS CLOUD - INVENTORY LEDGER
// ============================================================================
// Module: ledger/src/postgres/container.rs
// Description: Postgres-backed ContainerRepository, storing each Container
//              as a JSONB document keyed by container_id.
// ============================================================================

use async_trait::async_trait;
use sqlx::{PgPool, Row};

use crate::domain::Container;
use crate::error::{LedgerError, Result};
use crate::repository::ContainerRepository;

pub struct PgContainerRepository {
    pool: PgPool,
}

impl PgContainerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ContainerRepository for PgContainerRepository {
    async fn find(&self, container_id: &str) -> Result<Option<Container>> {
        let row = sqlx::query("SELECT document FROM containers WHERE container_id = $1")
            .bind(container_id)
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

    async fn save(&self, container: &Container) -> Result<()> {
        let document = serde_json::to_value(container).map_err(|err| LedgerError::SchemaValidation(err.to_string()))?;
        sqlx::query(
            "INSERT INTO containers (container_id, document) VALUES ($1, $2)
             ON CONFLICT (container_id) DO UPDATE SET document = EXCLUDED.document",
        )
        .bind(&container.container_id)
        .bind(&document)
        .execute(&self.pool)
        .await
        .map_err(|err| LedgerError::Repository(err.into()))?;
        Ok(())
    }
}
