//! Shared type definitions for the span proposer.
//!
//! This crate provides the central [`ProofRequest`] entity together with the small
//! set of enums and ephemeral range types that the ledger, derivation, prover-gateway,
//! and orchestrator crates all need to agree on.
//!
//! ## Overview
//!
//! The data model is organized around one entity, [`ProofRequest`], which moves through
//! a four-state lifecycle ([`RequestStatus`]) while covering an inclusive L2 block range
//! and carrying either a `SPAN` or an `AGG` proof ([`RequestType`]).

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_with::{base64::Base64, serde_as};

/// Opaque monotonically increasing identifier assigned by the ledger at insert time.
pub type RequestId = i64;

/// The two kinds of proof request tracked by the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RequestType {
    /// A proof covering a contiguous range of L2 blocks produced directly from span batches.
    Span,
    /// A proof that compresses a consecutive run of completed span proofs, anchored to an L1 checkpoint.
    Agg,
}

impl RequestType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Span => "SPAN",
            Self::Agg => "AGG",
        }
    }
}

impl std::fmt::Display for RequestType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RequestType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SPAN" => Ok(Self::Span),
            "AGG" => Ok(Self::Agg),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

/// The four states a [`ProofRequest`] can be in.
///
/// `UNREQ -> REQ -> (COMPLETE | FAILED)`. `FAILED` is terminal per-record; the retry
/// policy (owned by the orchestrator) inherits its work into one or two fresh `UNREQ`
/// successors rather than mutating the failed row back to life.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RequestStatus {
    /// Created, not yet sent to the prover.
    Unrequested,
    /// Sent to the prover; awaiting completion or timeout.
    Requested,
    /// Prover returned a proof; `proof` is non-empty.
    Complete,
    /// The request failed, either before reaching the prover or after a timeout/rejection.
    Failed,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unrequested => "UNREQ",
            Self::Requested => "REQ",
            Self::Complete => "COMPLETE",
            Self::Failed => "FAILED",
        }
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RequestStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "UNREQ" => Ok(Self::Unrequested),
            "REQ" => Ok(Self::Requested),
            "COMPLETE" => Ok(Self::Complete),
            "FAILED" => Ok(Self::Failed),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

/// Returned when a stored `TEXT` discriminant does not match a known enum variant.
///
/// Surfaces a corrupt row (e.g. hand-edited database, or a schema migration that forgot
/// to backfill a column) as a typed error instead of panicking deep in a query mapper.
#[derive(Debug, thiserror::Error)]
#[error("unknown enum variant: {0}")]
pub struct UnknownVariant(pub String);

/// The central ledger entity: one proof request, its covering range, and its lifecycle state.
///
/// See the ledger-wide invariants in the specification: non-overlapping `SPAN` ranges,
/// `AGG` checkpoint presence once non-`UNREQ`, non-empty `prover_request_id` while
/// in flight, non-empty `proof` iff `COMPLETE`.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofRequest {
    pub id: RequestId,
    #[serde(rename = "type")]
    pub kind: RequestType,
    pub start_block: u64,
    pub end_block: u64,
    pub status: RequestStatus,
    pub prover_request_id: String,
    pub request_added_time: u64,
    pub proof_request_time: u64,
    pub l1_block_number: u64,
    pub l1_block_hash: String,
    #[serde_as(as = "Base64")]
    pub proof: Vec<u8>,
}

impl ProofRequest {
    /// Number of L2 blocks this request covers (inclusive range).
    pub fn block_count(&self) -> u64 {
        self.end_block - self.start_block + 1
    }

    pub fn is_span(&self) -> bool {
        matches!(self.kind, RequestType::Span)
    }

    pub fn is_agg(&self) -> bool {
        matches!(self.kind, RequestType::Agg)
    }

    pub fn has_l1_checkpoint(&self) -> bool {
        self.l1_block_number > 0 && !self.l1_block_hash.is_empty()
    }
}

/// An ephemeral, non-persisted L2 block range covered by one span batch.
///
/// Produced by range derivation, consumed by the orchestrator's derive-span-ranges pass
/// to seed fresh `UNREQ` `SPAN` ledger rows. Never stored directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SpanBatchRange {
    pub start: u64,
    pub end: u64,
}

impl SpanBatchRange {
    pub fn new(start: u64, end: u64) -> Self {
        debug_assert!(start <= end, "span batch range must be non-empty: {start}..={end}");
        Self { start, end }
    }

    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// Intersects this range with `[lo, hi]`, returning `None` if disjoint.
    pub fn clip(&self, lo: u64, hi: u64) -> Option<Self> {
        let start = self.start.max(lo);
        let end = self.end.min(hi);
        (start <= end).then_some(Self { start, end })
    }
}

/// Current wall-clock time in whole seconds since the Unix epoch.
///
/// Centralized so every crate that stamps `request_added_time`/`proof_request_time`
/// agrees on the same clock source.
pub fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock is before the Unix epoch")
        .as_secs()
}
