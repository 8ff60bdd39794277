// ============================================================================
// OLYMPUS CLOUD - INVENTORY LEDGER
// ============================================================================
// Module: ledger/src/postgres/mod.rs
// Description: Postgres-backed repository implementations (C6), gated
//              behind the `postgres` feature. The aggregate is stored as a
//              JSONB document keyed by sku, with `version` broken out as a
//              dedicated column for the CAS check (spec §6.3).
// ============================================================================

mod assembly_order;
mod container;
mod ledger;
mod outbox;
mod product_stock;
mod serial_number;
mod snapshot;
mod transfer;

pub use assembly_order::PgAssemblyOrderRepository;
pub use container::PgContainerRepository;
pub use ledger::PgLedgerRepository;
pub use outbox::PgOutboxRepository;
pub use product_stock::PgProductStockRepository;
pub use serial_number::PgSerialNumberRepository;
pub use snapshot::PgSnapshotRepository;
pub use transfer::PgTransferRepository;
