// ============================================================================
// OLYMPUS CLOUD - INVENTORY LEDGER
// ============================================================================
// Module: ledger/src/domain/mod.rs
// Description: Aggregate, value objects, events, ledger entries, and
//              lifecycle state machines — the pure domain layer (C1-C4).
// ============================================================================

pub mod aggregate;
pub mod events;
pub mod ledger_entry;
pub mod state_machines;
pub mod value_objects;

pub use aggregate::ProductStock;
pub use events::DomainEvent;
pub use ledger_entry::{ChangeType, InventoryLedgerEntry};
pub use state_machines::{AssemblyOrder, AssemblyOrderStatus, StockTransfer, TransferStatus};
pub use value_objects::*;
