// ============================================================================
// OLYMPUS CLOUD - INVENTORY LEDGER
// ============================================================================
// Module: ledger/src/outbox/mod.rs
// Description: Transactional outbox record (C5) and publisher (C9).
// ============================================================================

pub mod publisher;
pub mod record;

pub use publisher::{spawn_outbox_publisher, spawn_retention_sweeper, OutboxPublisherConfig};
pub use record::OutboxEvent;
