//! Retry policy (§4.4): what a `FAILED` record's successor(s) look like.
//!
//! `AGG` failures are re-inserted unchanged; `SPAN` failures are bisected on the
//! assumption that oversized ranges, not bad luck, are what exhausts the prover. A
//! single-block `SPAN` cannot be bisected further — that's a fatal condition the tick
//! surfaces rather than silently producing an empty range (§4.4, §9 open question).

use proposer_ledger::Ledger;
use proposer_types::{ProofRequest, RequestId, RequestType};
use tracing::info;

use crate::error::{Error, Result};

/// Replaces a `FAILED` record with its retry successor(s), returning the new ids.
pub async fn retry(ledger: &Ledger, now: u64, failed: &ProofRequest) -> Result<Vec<RequestId>> {
    match failed.kind {
        RequestType::Agg => retry_agg(ledger, now, failed).await,
        RequestType::Span => retry_span(ledger, now, failed).await,
    }
}

async fn retry_agg(ledger: &Ledger, now: u64, failed: &ProofRequest) -> Result<Vec<RequestId>> {
    let id = ledger
        .insert(RequestType::Agg, failed.start_block, failed.end_block, now)
        .await?;
    info!(
        failed_id = failed.id,
        new_id = id,
        start = failed.start_block,
        end = failed.end_block,
        "retried AGG record with unchanged range"
    );
    Ok(vec![id])
}

async fn retry_span(ledger: &Ledger, now: u64, failed: &ProofRequest) -> Result<Vec<RequestId>> {
    let (s, e) = (failed.start_block, failed.end_block);
    if s == e {
        return Err(Error::UnsplittableSpan { id: failed.id, block: s });
    }

    let mid = s + (e - s) / 2;
    let left = (s, mid);
    let right = (mid + 1, e);

    let left_id = ledger.insert(RequestType::Span, left.0, left.1, now).await?;
    let right_id = ledger.insert(RequestType::Span, right.0, right.1, now).await?;

    info!(
        failed_id = failed.id,
        left = ?left,
        right = ?right,
        "split SPAN record on retry"
    );
    Ok(vec![left_id, right_id])
}
