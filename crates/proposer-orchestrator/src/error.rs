//! Orchestrator-scoped error type.
//!
//! Each tick composes the per-crate error types of its collaborators with the pass and
//! record context the collaborators themselves don't know about (§7.1): which pass was
//! running and which record id it was operating on.

use proposer_types::RequestId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("ledger error: {0}")]
    Ledger(#[from] proposer_ledger::Error),

    #[error("prover gateway error: {0}")]
    ProverGateway(#[from] prover_gateway::Error),

    #[error("derivation error: {0}")]
    Derivation(#[from] proposer_derivation::Error),

    #[error("output oracle error: {0}")]
    OutputOracle(#[source] anyhow::Error),

    #[error("checkpoint provider error: {0}")]
    Checkpoint(#[source] anyhow::Error),

    /// A `SPAN` record of a single block failed and cannot be bisected further (§4.4).
    #[error("record {id} covers a single block [{block}, {block}] and cannot be split on retry")]
    UnsplittableSpan { id: RequestId, block: u64 },
}

pub type Result<T> = std::result::Result<T, Error>;
