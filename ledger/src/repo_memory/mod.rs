// ============================================================================
// OLYMPUS CLOUD - INVENTORY LEDGER
// ============================================================================
// Module: ledger/src/repo_memory/mod.rs
// Description: In-memory repository implementations. Always available
//              (not feature-gated) for tests and standalone operation; the
//              Postgres-backed set under `ledger::postgres` is the
//              production path, gated behind the `postgres` feature.
// ============================================================================

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{AssemblyOrder, Container, InventoryLedgerEntry, ProductStock, SerialNumber, StockTransfer};
use crate::error::Result;
use crate::outbox::OutboxEvent;
use crate::repository::{
    AssemblyOrderRepository, ContainerRepository, LedgerRepository, OutboxRepository, ProductStockRepository,
    SerialNumberRepository, SnapshotRepository, TransferRepository,
};
use crate::snapshot::InventorySnapshot;

/// Shares its ledger and outbox stores with whatever `InMemoryLedgerRepository`
/// / `InMemoryOutboxRepository` the caller wires into the rest of the
/// service — `save` writes through to both so a composition root only needs
/// to keep one `Arc` of each alive (see `outbox_repository`/`ledger_repository`).
pub struct InMemoryProductStockRepository {
    stocks: Mutex<HashMap<String, ProductStock>>,
    ledger: Arc<InMemoryLedgerRepository>,
    outbox: Arc<InMemoryOutboxRepository>,
}

impl Default for InMemoryProductStockRepository {
    fn default() -> Self {
        Self::new(Arc::new(InMemoryLedgerRepository::default()), Arc::new(InMemoryOutboxRepository::default()))
    }
}

impl InMemoryProductStockRepository {
    pub fn new(ledger: Arc<InMemoryLedgerRepository>, outbox: Arc<InMemoryOutboxRepository>) -> Self {
        Self { stocks: Mutex::new(HashMap::new()), ledger, outbox }
    }

    /// The ledger store this repository writes through to, so a composition
    /// root can hand the same `Arc` to whatever reads ledger history.
    pub fn ledger_repository(&self) -> Arc<InMemoryLedgerRepository> {
        self.ledger.clone()
    }

    /// The outbox store this repository writes through to, so the outbox
    /// publisher polls the rows this repository actually inserts rather
    /// than a disconnected store.
    pub fn outbox_repository(&self) -> Arc<InMemoryOutboxRepository> {
        self.outbox.clone()
    }
}

#[async_trait]
impl ProductStockRepository for InMemoryProductStockRepository {
    async fn find(&self, sku: &str) -> Result<Option<ProductStock>> {
        Ok(self.stocks.lock().unwrap().get(sku).cloned())
    }

    /// Persists the aggregate, then its ledger entry and outbox rows. Real
    /// cross-store atomicity isn't possible with three independent mutexes;
    /// the CAS check on `stocks` still guarantees only one writer ever gets
    /// past it for a given `expected_version`, so no ledger entry/outbox row
    /// is ever written for a commit that lost the race (spec §4.2 step 5).
    async fn save(
        &self,
        stock: &ProductStock,
        expected_version: i64,
        ledger_entry: Option<&InventoryLedgerEntry>,
        outbox_rows: &[OutboxEvent],
    ) -> Result<bool> {
        {
            let mut stocks = self.stocks.lock().unwrap();
            match stocks.get(&stock.sku) {
                Some(existing) if existing.version != expected_version => return Ok(false),
                _ => {}
            }
            let mut persisted = stock.clone();
            persisted.version = expected_version + 1;
            persisted.pending_events.clear();
            stocks.insert(stock.sku.clone(), persisted);
        }

        if let Some(entry) = ledger_entry {
            self.ledger.append(entry).await?;
        }
        for row in outbox_rows {
            self.outbox.insert(row.clone()).await?;
        }
        Ok(true)
    }

    async fn list_all(&self) -> Result<Vec<ProductStock>> {
        Ok(self.stocks.lock().unwrap().values().cloned().collect())
    }
}

#[derive(Default)]
pub struct InMemoryLedgerRepository {
    entries: Mutex<Vec<InventoryLedgerEntry>>,
}

#[async_trait]
impl LedgerRepository for InMemoryLedgerRepository {
    async fn append(&self, entry: &InventoryLedgerEntry) -> Result<()> {
        self.entries.lock().unwrap().push(entry.clone());
        Ok(())
    }

    async fn history_for_sku(&self, sku: &str, since: Option<DateTime<Utc>>) -> Result<Vec<InventoryLedgerEntry>> {
        Ok(self
            .entries
            .lock()
            .unwrap()
            .iter()
            .filter(|entry| entry.sku == sku && since.map(|s| entry.timestamp >= s).unwrap_or(true))
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub struct InMemoryOutboxRepository {
    rows: Mutex<HashMap<Uuid, OutboxEvent>>,
}

impl InMemoryOutboxRepository {
    pub fn unpublished_count(&self) -> usize {
        self.rows.lock().unwrap().values().filter(|row| !row.published).count()
    }
}

#[async_trait]
impl OutboxRepository for InMemoryOutboxRepository {
    async fn insert(&self, row: OutboxEvent) -> Result<()> {
        self.rows.lock().unwrap().insert(row.id, row);
        Ok(())
    }

    async fn fetch_unpublished(&self, limit: u32) -> Result<Vec<OutboxEvent>> {
        let rows = self.rows.lock().unwrap();
        let mut unpublished: Vec<OutboxEvent> = rows.values().filter(|row| !row.published).cloned().collect();
        unpublished.sort_by_key(|row| (row.created_at, row.id));
        unpublished.truncate(limit as usize);
        Ok(unpublished)
    }

    async fn mark_published(&self, id: Uuid, published_at: DateTime<Utc>) -> Result<()> {
        if let Some(row) = self.rows.lock().unwrap().get_mut(&id) {
            row.published = true;
            row.published_at = Some(published_at);
        }
        Ok(())
    }

    async fn mark_retry(&self, id: Uuid, retry_count: u32) -> Result<()> {
        if let Some(row) = self.rows.lock().unwrap().get_mut(&id) {
            row.retry_count = retry_count;
        }
        Ok(())
    }

    async fn purge_published_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|_, row| !(row.published && row.created_at < cutoff));
        Ok((before - rows.len()) as u64)
    }
}

#[derive(Default)]
pub struct InMemorySnapshotRepository {
    snapshots: Mutex<Vec<InventorySnapshot>>,
}

#[async_trait]
impl SnapshotRepository for InMemorySnapshotRepository {
    async fn save(&self, snapshot: &InventorySnapshot) -> Result<()> {
        self.snapshots.lock().unwrap().push(snapshot.clone());
        Ok(())
    }

    async fn latest_before(&self, sku: &str, at: DateTime<Utc>) -> Result<Option<InventorySnapshot>> {
        Ok(self
            .snapshots
            .lock()
            .unwrap()
            .iter()
            .filter(|snapshot| snapshot.sku == sku && snapshot.snapshot_timestamp <= at)
            .max_by_key(|snapshot| snapshot.snapshot_timestamp)
            .cloned())
    }
}

#[derive(Default)]
pub struct InMemoryTransferRepository {
    transfers: Mutex<HashMap<Uuid, StockTransfer>>,
}

#[async_trait]
impl TransferRepository for InMemoryTransferRepository {
    async fn find(&self, transfer_id: Uuid) -> Result<Option<StockTransfer>> {
        Ok(self.transfers.lock().unwrap().get(&transfer_id).cloned())
    }

    async fn save(&self, transfer: &StockTransfer) -> Result<()> {
        self.transfers.lock().unwrap().insert(transfer.transfer_id, transfer.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryAssemblyOrderRepository {
    orders: Mutex<HashMap<Uuid, AssemblyOrder>>,
}

#[async_trait]
impl AssemblyOrderRepository for InMemoryAssemblyOrderRepository {
    async fn find(&self, order_id: Uuid) -> Result<Option<AssemblyOrder>> {
        Ok(self.orders.lock().unwrap().get(&order_id).cloned())
    }

    async fn save(&self, order: &AssemblyOrder) -> Result<()> {
        self.orders.lock().unwrap().insert(order.order_id, order.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemorySerialNumberRepository {
    serials: Mutex<HashMap<String, SerialNumber>>,
}

#[async_trait]
impl SerialNumberRepository for InMemorySerialNumberRepository {
    async fn find(&self, serial: &str) -> Result<Option<SerialNumber>> {
        Ok(self.serials.lock().unwrap().get(serial).cloned())
    }

    async fn save(&self, serial: &SerialNumber) -> Result<()> {
        self.serials.lock().unwrap().insert(serial.serial.clone(), serial.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryContainerRepository {
    containers: Mutex<HashMap<String, Container>>,
}

#[async_trait]
impl ContainerRepository for InMemoryContainerRepository {
    async fn find(&self, container_id: &str) -> Result<Option<Container>> {
        Ok(self.containers.lock().unwrap().get(container_id).cloned())
    }

    async fn save(&self, container: &Container) -> Result<()> {
        self.containers.lock().unwrap().insert(container.container_id.clone(), container.clone());
        Ok(())
    }
}
