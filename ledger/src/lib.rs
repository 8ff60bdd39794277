// ============================================================================
// OLYMPUS CLOUD - INVENTORY LEDGER
// ============================================================================
// Module: ledger/src/lib.rs
// Description: Authoritative stock ledger — ProductStock aggregate,
//              optimistic-concurrency command service, transactional
//              outbox, event replay, and the repository ports they're
//              built against.
// ============================================================================

pub mod bulk_allocator;
pub mod command_service;
pub mod domain;
pub mod error;
pub mod event_ingest;
pub mod outbox;
pub mod query_service;
pub mod repo_memory;
pub mod repository;
pub mod snapshot;

#[cfg(feature = "postgres")]
pub mod postgres;

pub use bulk_allocator::{AllocationRequest, AllocationOutcome, BulkAllocationResult, BulkAllocator};
pub use command_service::{CommandRetryConfig, CommandService};
pub use error::{LedgerError, Result};
pub use event_ingest::{EventIngestService, IngestedEvent};
pub use outbox::{OutboxEvent, OutboxPublisherConfig};
pub use query_service::{CacheInvalidator, HealthMetrics, NoopCacheInvalidator, QueryService, StockLevelView};
pub use repo_memory::{
    InMemoryAssemblyOrderRepository, InMemoryContainerRepository, InMemoryLedgerRepository,
    InMemoryOutboxRepository, InMemoryProductStockRepository, InMemorySerialNumberRepository,
    InMemorySnapshotRepository, InMemoryTransferRepository,
};
pub use repository::{
    AssemblyOrderRepository, ContainerRepository, LedgerRepository, OutboxRepository, ProductStockRepository,
    SerialNumberRepository, SnapshotRepository, TransferRepository,
};
pub use snapshot::{replay, InventorySnapshot, SnapshotType};
