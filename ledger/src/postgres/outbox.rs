// ============================================================================
// OLYMPUS CLOUD - INVENTORY LEDGER
// ============================================================================
// Module: ledger/src/postgres/outbox.rs
// Description: Postgres-backed OutboxRepository. `outbox_events` is indexed
//              by (published, created_at) for publisher selection and by
//              aggregate_id for ordered retrieval (spec §6.3).
// ============================================================================

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::error::{LedgerError, Result};
use crate::outbox::OutboxEvent;
use crate::repository::OutboxRepository;

pub struct PgOutboxRepository {
    pool: PgPool,
}

impl PgOutboxRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OutboxRepository for PgOutboxRepository {
    /// Used by flows that don't go through `ProductStockRepository::save`'s
    /// bundled aggregate+ledger+outbox transaction (e.g. serial-number
    /// transitions), so their events still land in the row set the publisher
    /// drains.
    async fn insert(&self, row: OutboxEvent) -> Result<()> {
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
        .execute(&self.pool)
        .await
        .map_err(|err| LedgerError::Repository(err.into()))?;
        Ok(())
    }

    async fn fetch_unpublished(&self, limit: u32) -> Result<Vec<OutboxEvent>> {
        let rows = sqlx::query(
            "SELECT id, aggregate_id, event_type, payload, created_at, published, published_at, retry_count
             FROM outbox_events
             WHERE published = false
             ORDER BY aggregate_id, created_at
             LIMIT $1",
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|err| LedgerError::Repository(err.into()))?;

        Ok(rows
            .into_iter()
            .map(|row| OutboxEvent {
                id: row.get("id"),
                aggregate_id: row.get("aggregate_id"),
                event_type: row.get("event_type"),
                event_data: row.get("payload"),
                created_at: row.get("created_at"),
                published: row.get("published"),
                published_at: row.get("published_at"),
                retry_count: row.get::<i32, _>("retry_count") as u32,
            })
            .collect())
    }

    async fn mark_published(&self, id: Uuid, published_at: DateTime<Utc>) -> Result<()> {
        sqlx::query("UPDATE outbox_events SET published = true, published_at = $1 WHERE id = $2")
            .bind(published_at)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|err| LedgerError::Repository(err.into()))?;
        Ok(())
    }

    async fn mark_retry(&self, id: Uuid, retry_count: u32) -> Result<()> {
        sqlx::query("UPDATE outbox_events SET retry_count = $1 WHERE id = $2")
            .bind(retry_count as i32)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|err| LedgerError::Repository(err.into()))?;
        Ok(())
    }

    async fn purge_published_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM outbox_events WHERE published = true AND created_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .map_err(|err| LedgerError::Repository(err.into()))?;
        Ok(result.rows_affected())
    }
}
