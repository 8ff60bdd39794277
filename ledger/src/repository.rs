// ============================================================================
// OLYMPUS CLOUD - INVENTORY LEDGER
// ============================================================================
// Module: ledger/src/repository.rs
// Description: Repository contracts (C6) — abstract ports for ProductStock,
//              Ledger, Outbox, Snapshot, SerialNumber, Transfer, Container
//              (and AssemblyOrder). Postgres implementations live under
//              `ledger::postgres` behind the `postgres` feature; an
//              in-memory set is always available for tests and standalone
//              operation.
// ============================================================================

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{AssemblyOrder, Container, InventoryLedgerEntry, ProductStock, SerialNumber, StockTransfer};
use crate::error::Result;
use crate::outbox::OutboxEvent;
use crate::snapshot::InventorySnapshot;

/// CAS-guarded aggregate persistence. `save` must fail with
/// `LedgerError::ConcurrentModification` (mapped from a zero-rows-affected
/// write) when `expected_version` doesn't match the stored row — see
/// spec §4.2 step 5.
#[async_trait]
pub trait ProductStockRepository: Send + Sync {
    async fn find(&self, sku: &str) -> Result<Option<ProductStock>>;

    /// Persists `stock` plus its `ledger_entry` (if any) and `outbox_rows`
    /// atomically, guarded by compare-and-swap on `expected_version`.
    /// Returns `Ok(false)` on a CAS mismatch (no error, no partial write) so
    /// the command service can reload and retry.
    async fn save(
        &self,
        stock: &ProductStock,
        expected_version: i64,
        ledger_entry: Option<&InventoryLedgerEntry>,
        outbox_rows: &[OutboxEvent],
    ) -> Result<bool>;

    /// Every known aggregate, for read-side scans that need to iterate the
    /// whole population (e.g. `QueryService::get_health_metrics`). No
    /// pagination — the spec names no such endpoint, so this is a best
    /// effort for the in-memory/one-shot-batch case.
    async fn list_all(&self) -> Result<Vec<ProductStock>>;
}

#[async_trait]
pub trait LedgerRepository: Send + Sync {
    async fn append(&self, entry: &InventoryLedgerEntry) -> Result<()>;
    async fn history_for_sku(&self, sku: &str, since: Option<DateTime<Utc>>) -> Result<Vec<InventoryLedgerEntry>>;
}

/// Selection and claim interface for the outbox publisher (C9).
#[async_trait]
pub trait OutboxRepository: Send + Sync {
    /// Inserts a single outbox row outside of an aggregate-write transaction
    /// — used for events from collections that don't go through
    /// `ProductStockRepository::save` (e.g. serial-number transitions).
    async fn insert(&self, row: OutboxEvent) -> Result<()>;

    /// Up to `limit` unpublished rows ordered by `(created_at, id)`,
    /// grouped so all rows for one aggregate are contiguous and in order
    /// (spec §4.4 step 3).
    async fn fetch_unpublished(&self, limit: u32) -> Result<Vec<OutboxEvent>>;
    async fn mark_published(&self, id: Uuid, published_at: DateTime<Utc>) -> Result<()>;
    async fn mark_retry(&self, id: Uuid, retry_count: u32) -> Result<()>;
    async fn purge_published_before(&self, cutoff: DateTime<Utc>) -> Result<u64>;
}

#[async_trait]
pub trait SnapshotRepository: Send + Sync {
    async fn save(&self, snapshot: &InventorySnapshot) -> Result<()>;
    async fn latest_before(&self, sku: &str, at: DateTime<Utc>) -> Result<Option<InventorySnapshot>>;
}

#[async_trait]
pub trait TransferRepository: Send + Sync {
    async fn find(&self, transfer_id: Uuid) -> Result<Option<StockTransfer>>;
    async fn save(&self, transfer: &StockTransfer) -> Result<()>;
}

#[async_trait]
pub trait AssemblyOrderRepository: Send + Sync {
    async fn find(&self, order_id: Uuid) -> Result<Option<AssemblyOrder>>;
    async fn save(&self, order: &AssemblyOrder) -> Result<()>;
}

/// Serials are independent of `ProductStock` (weak sku reference, spec §3.2,
/// §6.3) — they don't share its CAS/version column.
#[async_trait]
pub trait SerialNumberRepository: Send + Sync {
    async fn find(&self, serial: &str) -> Result<Option<SerialNumber>>;
    async fn save(&self, serial: &SerialNumber) -> Result<()>;
}

#[async_trait]
pub trait ContainerRepository: Send + Sync {
    async fn find(&self, container_id: &str) -> Result<Option<Container>>;
    async fn save(&self, container: &Container) -> Result<()>;
}
