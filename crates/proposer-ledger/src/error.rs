//! Ledger-scoped error type.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("migration error: {0}")]
    Migration(#[from] rusqlite_migration::Error),

    #[error("connection pool error: {0}")]
    Pool(#[from] deadpool::managed::PoolError<rusqlite::Error>),

    #[error("pooled connection task panicked or was cancelled: {0}")]
    Interact(String),

    #[error("no record with id {0}")]
    NotFound(proposer_types::RequestId),

    #[error("record {id} expected status {expected}, found {actual}")]
    PreconditionFailed { id: proposer_types::RequestId, expected: &'static str, actual: String },

    #[error("no completed SPAN records tile [{start}, {end}] without gap or overlap")]
    NoTilingCoverage { start: u64, end: u64 },

    #[error("invalid block range [{start}, {end}]: start_block must be <= end_block")]
    InvalidRange { start: u64, end: u64 },

    #[error("corrupt row: {0}")]
    UnknownVariant(#[from] proposer_types::UnknownVariant),
}

pub type Result<T> = std::result::Result<T, Error>;
