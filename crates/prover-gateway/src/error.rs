//! Gateway-scoped error type.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The request timed out before the prover responded. Surfaced distinctly per
    /// §4.3/§5 so the orchestrator can retry without penalizing the record.
    #[error("prover request timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("prover request error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("prover returned status {status} for {url}: {body}")]
    ErrorStatus {
        url: String,
        status: reqwest::StatusCode,
        body: String,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
