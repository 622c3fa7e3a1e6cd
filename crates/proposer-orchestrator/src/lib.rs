//! The Proof Orchestrator (C4) and Aggregation gating it drives: the tick loop that
//! schedules span/aggregate proof requests, polls the prover, times out and retries,
//! and hands off to the ledger's Aggregation Planner (C5) once enough span proofs
//! tile the next required on-chain output.
//!
//! See [`Orchestrator::tick`] for the four passes (§4.4) and [`retry::retry`] for the
//! split/re-insert policy a `FAILED` record goes through.

mod error;
pub mod metrics;
mod orchestrator;
mod retry;
mod traits;

pub use error::{Error, Result};
pub use orchestrator::{Orchestrator, OrchestratorConfig};
pub use traits::{CheckpointProvider, L1Checkpoint, OutputOracle};
