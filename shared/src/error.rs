use thiserror::Error;

/// Ambient infrastructure error shared by every service built on this
/// crate. Domain-specific error taxonomies (see
/// `olympus_ledger::error::LedgerError`) wrap these as their
/// `RepositoryError`/`BusError` variants rather than re-deriving them.
#[derive(Error, Debug)]
pub enum Error {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("event bus error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Nominal HTTP status class an adapter would map this onto. The core
    /// never returns an HTTP response itself (framing is out of scope) but
    /// keeping the mapping here avoids every adapter reinventing it.
    pub fn status_code(&self) -> u16 {
        match self {
            Error::NotFound(_) => 404,
            Error::AlreadyExists(_) => 409,
            Error::Validation(_) | Error::InvalidInput(_) => 400,
            _ => 500,
        }
    }
}
