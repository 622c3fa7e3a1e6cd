//! Wire types for the external prover HTTP service (§6).

use serde::{Deserialize, Serialize};
use serde_with::{base64::Base64, serde_as};

#[derive(Debug, Clone, Serialize)]
pub struct RequestSpanProofRequest {
    pub start: u64,
    pub end: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RequestProofResponse {
    pub proof_id: String,
}

#[serde_as]
#[derive(Debug, Clone, Serialize)]
pub struct RequestAggProofRequest {
    #[serde_as(as = "Vec<Base64>")]
    pub subproofs: Vec<Vec<u8>>,
    pub head: String,
}

#[serde_as]
#[derive(Debug, Clone, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    #[serde_as(as = "Base64")]
    #[serde(default)]
    pub proof: Vec<u8>,
}

/// The three statuses the orchestrator distinguishes; everything else the prover
/// returns is folded into [`ProofStatus::Pending`] (§4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProofStatus {
    Fulfilled,
    Unclaimed,
    Pending,
}

impl From<&str> for ProofStatus {
    fn from(status: &str) -> Self {
        match status {
            "PROOF_FULFILLED" => Self::Fulfilled,
            "PROOF_UNCLAIMED" => Self::Unclaimed,
            _ => Self::Pending,
        }
    }
}
