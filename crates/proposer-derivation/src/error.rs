//! Error kinds distinguished by range derivation.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// No span batch covers the requested block, distinct from a generic parse failure.
    #[error("no span batch covers L2 block {0}")]
    NoSpanBatch(u64),

    /// Search-bound translation extended past the configured deviation cap.
    #[error("derivation spans {actual} L1 blocks, exceeding the configured max of {max}")]
    MaxDeviationExceeded { actual: u64, max: u64 },

    /// A channel produced zero batches after reassembly — corrupt or missing L1 data.
    #[error("channel {0} reassembled with zero batches")]
    EmptyChannel(String),

    /// The rollup node, L1, or beacon capability trait returned an error.
    #[error("upstream RPC error: {0}")]
    Rpc(String),

    #[error("scratch directory I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
