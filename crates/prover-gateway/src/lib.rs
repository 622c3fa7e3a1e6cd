//! HTTP client for the external prover service (C3).
//!
//! Bit-level wire compatibility with §6: `request_span_proof`, `request_agg_proof`,
//! and `get_status` map directly onto the three prover HTTP routes. The orchestrator
//! only ever sees [`ProofStatus`]'s three variants — everything the prover might
//! return besides `PROOF_FULFILLED`/`PROOF_UNCLAIMED` folds into `Pending`.

mod client;
mod error;
mod types;

pub use client::ProverGateway;
pub use error::{Error, Result};
pub use types::ProofStatus;
