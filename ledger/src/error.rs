// ============================================================================
// OLYMPUS CLOUD - INVENTORY LEDGER
// ============================================================================
// Module: ledger/src/error.rs
// Description: Error taxonomy for the stock ledger (spec §7). Precondition
//              errors are terminal and never retried; `ConcurrentModification`
//              and infrastructure errors are the two retryable kinds.
// ============================================================================

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("invalid quantity: {0}")]
    InvalidQuantity(String),

    #[error("insufficient stock: available={available}, requested={requested}")]
    InsufficientStock { available: i64, requested: i64 },

    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    #[error("product stock not found: {0}")]
    ProductStockNotFound(String),

    #[error("concurrent modification: retry budget exhausted for {0}")]
    ConcurrentModification(String),

    #[error("command deadline exceeded")]
    Timeout,

    #[error("repository error: {0}")]
    Repository(#[from] olympus_shared::Error),

    #[error("event bus error: {0}")]
    Bus(#[from] olympus_shared::events::EventBusError),

    #[error("malformed event payload: {0}")]
    SchemaValidation(String),
}

pub type Result<T> = std::result::Result<T, LedgerError>;

impl LedgerError {
    /// Nominal HTTP status class an adapter would map this onto, per the
    /// table in spec §7.
    pub fn status_code(&self) -> u16 {
        match self {
            LedgerError::InvalidQuantity(_) | LedgerError::InsufficientStock { .. } => 400,
            LedgerError::ProductStockNotFound(_) => 404,
            LedgerError::ConcurrentModification(_) => 409,
            LedgerError::Timeout => 504,
            LedgerError::Repository(_) | LedgerError::Bus(_) => 503,
            LedgerError::InvariantViolation(_) => 500,
            LedgerError::SchemaValidation(_) => 422,
        }
    }

    /// Whether the command service's retry loop should attempt this
    /// operation again. Precondition errors are never retried (spec §7).
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LedgerError::ConcurrentModification(_) | LedgerError::Repository(_) | LedgerError::Bus(_)
        )
    }
}
