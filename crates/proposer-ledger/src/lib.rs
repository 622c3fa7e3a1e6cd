//! Durable storage for [`proposer_types::ProofRequest`] records.
//!
//! Backed by a single-file SQLite database driven through a `deadpool`-managed pool of
//! pooled, blocking `rusqlite` connections over WAL mode — the same shape as
//! `miden-node`'s `store` crate, scaled down from a multi-reader RPC server to a
//! single-process proposer. Every operation below acquires one pooled connection and
//! runs inside an explicit `rusqlite` transaction, so each bullet in the specification
//! ("each atomic") is backed by a real `BEGIN`/`COMMIT`/`ROLLBACK`, not just a single
//! statement.

mod error;
mod migrations;
mod pool_manager;
mod queries;

use std::path::Path;

use proposer_types::{ProofRequest, RequestId, RequestStatus, RequestType};
use rusqlite::Connection;

pub use error::{Error, Result};
pub use pool_manager::{Pool, SqlitePoolManager};

/// The proof-request ledger.
///
/// Cheap to clone: internally it is just a `deadpool` pool handle (an `Arc` under the
/// hood), so every crate that needs ledger access can hold its own `Ledger` value.
#[derive(Clone)]
pub struct Ledger {
    pool: Pool,
}

impl Ledger {
    /// Opens (creating if necessary) the sqlite database at `path` and applies any
    /// pending migrations before returning.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let manager = SqlitePoolManager::new(path.as_ref().to_path_buf());
        let pool = Pool::builder(manager)
            .build()
            .expect("pool config is static and always valid");

        let ledger = Self { pool };
        ledger
            .interact(|conn| {
                migrations::apply(conn)?;
                Ok(())
            })
            .await?;
        Ok(ledger)
    }

    /// Opens an in-memory database with migrations applied. Used by tests.
    pub async fn open_in_memory() -> Result<Self> {
        Self::open(":memory:").await
    }

    async fn interact<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut Connection) -> Result<R> + Send + 'static,
        R: Send + 'static,
    {
        let conn = self.pool.get().await?;
        conn.interact(move |conn| f(conn))
            .await
            .map_err(|e| Error::Interact(e.to_string()))?
    }

    /// Creates a new record in state `UNREQ` with empty `prover_request_id` and `proof`.
    pub async fn insert(
        &self,
        kind: RequestType,
        start: u64,
        end: u64,
        request_added_time: u64,
    ) -> Result<RequestId> {
        self.interact(move |conn| {
            let tx = conn.transaction()?;
            let id = queries::insert(&tx, kind, start, end, request_added_time)?;
            tx.commit()?;
            Ok(id)
        })
        .await
    }

    /// Returns one record with `status = UNREQ`, chosen deterministically (lowest `id`
    /// first). Returns `None` if no such record exists.
    pub async fn next_unrequested(&self) -> Result<Option<ProofRequest>> {
        self.interact(|conn| queries::next_unrequested(conn)).await
    }

    /// Counts records currently in `status`.
    pub async fn count_by_status(&self, status: RequestStatus) -> Result<u64> {
        self.interact(move |conn| queries::count_by_status(conn, status))
            .await
    }

    /// Records with `status = FAILED` and `prover_request_id = ""` — these never
    /// reached the prover, distinct from prover-side failures.
    pub async fn get_failed_on_server(&self) -> Result<Vec<ProofRequest>> {
        self.interact(queries::get_failed_on_server).await
    }

    /// Records with `status = REQ` and `prover_request_id != ""`.
    pub async fn get_all_pending(&self) -> Result<Vec<ProofRequest>> {
        self.interact(queries::get_all_pending).await
    }

    /// Sets `prover_request_id` on the given record.
    pub async fn set_prover_request_id(&self, id: RequestId, prover_request_id: String) -> Result<()> {
        self.interact(move |conn| {
            let tx = conn.transaction()?;
            queries::set_prover_request_id(&tx, id, &prover_request_id)?;
            tx.commit()?;
            Ok(())
        })
        .await
    }

    /// Transitions the record to `new_status`.
    pub async fn update_status(&self, id: RequestId, new_status: RequestStatus) -> Result<()> {
        self.interact(move |conn| {
            let tx = conn.transaction()?;
            queries::update_status(&tx, id, new_status)?;
            tx.commit()?;
            Ok(())
        })
        .await
    }

    /// Optimistically transitions `id` from `UNREQ` to `REQ`, stamping
    /// `proof_request_time`. Fails with [`Error::PreconditionFailed`] if the record was
    /// not `UNREQ` at the time of the update — the precondition is enforced inside the
    /// same transaction as the write, not by the caller's last read.
    pub async fn mark_requested(&self, id: RequestId, now: u64) -> Result<()> {
        self.interact(move |conn| {
            let tx = conn.transaction()?;
            queries::mark_requested(&tx, id, now)?;
            tx.commit()?;
            Ok(())
        })
        .await
    }

    /// Sets `proof` and transitions to `COMPLETE` atomically. Fails if `status` was not
    /// `REQ`.
    pub async fn add_proof(&self, id: RequestId, proof: Vec<u8>) -> Result<()> {
        self.interact(move |conn| {
            let tx = conn.transaction()?;
            queries::add_proof(&tx, id, &proof)?;
            tx.commit()?;
            Ok(())
        })
        .await
    }

    /// Updates the matching `AGG` record's L1 checkpoint.
    pub async fn attach_l1_checkpoint(
        &self,
        start: u64,
        end: u64,
        l1_block_number: u64,
        l1_block_hash: String,
    ) -> Result<ProofRequest> {
        self.interact(move |conn| {
            let tx = conn.transaction()?;
            let req = queries::attach_l1_checkpoint(&tx, start, end, l1_block_number, &l1_block_hash)?;
            tx.commit()?;
            Ok(req)
        })
        .await
    }

    /// Returns the ordered proof blobs for `SPAN` records in state `COMPLETE` that tile
    /// `[start, end]` without gap or overlap. Fails if no such tiling exists.
    pub async fn get_consecutive_span_proofs(&self, start: u64, end: u64) -> Result<Vec<Vec<u8>>> {
        self.interact(move |conn| queries::get_consecutive_span_proofs(conn, start, end))
            .await
    }

    /// Highest `end_block` among all `SPAN` records, or `None` if there are none yet.
    /// Feeds Pass D's `derive_from` computation (§4.4).
    pub async fn max_span_end_block(&self) -> Result<Option<u64>> {
        self.interact(queries::max_span_end_block).await
    }

    /// Whether a `SPAN` record already covers exactly `[start, end]` — Pass D's
    /// idempotency check before inserting a freshly derived range (§4.4).
    pub async fn span_range_exists(&self, start: u64, end: u64) -> Result<bool> {
        self.interact(move |conn| queries::span_range_exists(conn, start, end)).await
    }

    /// Examines consecutive completed `SPAN` records starting at `from`; if they cover
    /// at least through `min_to`, inserts a new `AGG` record in `UNREQ` covering
    /// `[from, run_end]` and returns `(true, run_end)`. Otherwise `(false, 0)`.
    pub async fn try_create_agg_from_spans(
        &self,
        from: u64,
        min_to: u64,
        now: u64,
    ) -> Result<(bool, u64)> {
        self.interact(move |conn| {
            let tx = conn.transaction()?;
            let result = queries::try_create_agg_from_spans(&tx, from, min_to, now)?;
            tx.commit()?;
            Ok(result)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn insert_then_next_unrequested_round_trip() {
        let ledger = Ledger::open_in_memory().await.unwrap();
        let id = ledger.insert(RequestType::Span, 100, 199, 1_000).await.unwrap();

        let next = ledger.next_unrequested().await.unwrap().unwrap();
        assert_eq!(next.id, id);
        assert_eq!(next.status, RequestStatus::Unrequested);
        assert_eq!(next.start_block, 100);
        assert_eq!(next.end_block, 199);
    }

    #[tokio::test]
    async fn next_unrequested_picks_lowest_id() {
        let ledger = Ledger::open_in_memory().await.unwrap();
        ledger.insert(RequestType::Span, 200, 299, 1_000).await.unwrap();
        let first = ledger.insert(RequestType::Span, 0, 99, 999).await.unwrap();

        // Lowest id wins regardless of insertion order of block ranges.
        let next = ledger.next_unrequested().await.unwrap().unwrap();
        assert_eq!(next.id, first.min(next.id));
    }

    #[tokio::test]
    async fn full_lifecycle_round_trip() {
        let ledger = Ledger::open_in_memory().await.unwrap();
        let id = ledger.insert(RequestType::Span, 100, 199, 1_000).await.unwrap();

        ledger.mark_requested(id, 1_001).await.unwrap();
        assert_eq!(ledger.count_by_status(RequestStatus::Requested).await.unwrap(), 1);

        ledger.set_prover_request_id(id, "prover-abc".into()).await.unwrap();
        ledger.add_proof(id, b"proof-bytes".to_vec()).await.unwrap();

        assert_eq!(ledger.count_by_status(RequestStatus::Complete).await.unwrap(), 1);

        let proofs = ledger.get_consecutive_span_proofs(100, 199).await.unwrap();
        assert_eq!(proofs, vec![b"proof-bytes".to_vec()]);
    }

    #[tokio::test]
    async fn add_proof_rejects_non_requested_record() {
        let ledger = Ledger::open_in_memory().await.unwrap();
        let id = ledger.insert(RequestType::Span, 0, 9, 0).await.unwrap();

        let err = ledger.add_proof(id, b"x".to_vec()).await.unwrap_err();
        assert!(matches!(err, Error::PreconditionFailed { .. }));
    }

    #[tokio::test]
    async fn mark_requested_rejects_non_unrequested_record() {
        let ledger = Ledger::open_in_memory().await.unwrap();
        let id = ledger.insert(RequestType::Span, 0, 9, 0).await.unwrap();
        ledger.mark_requested(id, 1).await.unwrap();

        let err = ledger.mark_requested(id, 2).await.unwrap_err();
        assert!(matches!(err, Error::PreconditionFailed { .. }));
    }

    #[tokio::test]
    async fn get_failed_on_server_excludes_prover_side_failures() {
        let ledger = Ledger::open_in_memory().await.unwrap();

        let never_sent = ledger.insert(RequestType::Span, 0, 9, 0).await.unwrap();
        ledger.update_status(never_sent, RequestStatus::Failed).await.unwrap();

        let sent_then_failed = ledger.insert(RequestType::Span, 10, 19, 0).await.unwrap();
        ledger.mark_requested(sent_then_failed, 1).await.unwrap();
        ledger
            .set_prover_request_id(sent_then_failed, "prover-1".into())
            .await
            .unwrap();
        ledger.update_status(sent_then_failed, RequestStatus::Failed).await.unwrap();

        let failed_on_server = ledger.get_failed_on_server().await.unwrap();
        assert_eq!(failed_on_server.len(), 1);
        assert_eq!(failed_on_server[0].id, never_sent);
    }

    #[tokio::test]
    async fn get_all_pending_requires_prover_request_id() {
        let ledger = Ledger::open_in_memory().await.unwrap();

        let id = ledger.insert(RequestType::Span, 0, 9, 0).await.unwrap();
        ledger.mark_requested(id, 1).await.unwrap();

        assert!(ledger.get_all_pending().await.unwrap().is_empty());

        ledger.set_prover_request_id(id, "prover-1".into()).await.unwrap();
        let pending = ledger.get_all_pending().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, id);
    }

    #[tokio::test]
    async fn attach_l1_checkpoint_updates_matching_agg_record() {
        let ledger = Ledger::open_in_memory().await.unwrap();
        ledger.insert(RequestType::Agg, 1, 1000, 0).await.unwrap();

        let updated = ledger
            .attach_l1_checkpoint(1, 1000, 42, "0xabc".into())
            .await
            .unwrap();
        assert_eq!(updated.l1_block_number, 42);
        assert_eq!(updated.l1_block_hash, "0xabc");
        assert!(updated.has_l1_checkpoint());
    }

    #[tokio::test]
    async fn get_consecutive_span_proofs_fails_on_gap() {
        let ledger = Ledger::open_in_memory().await.unwrap();
        let id = ledger.insert(RequestType::Span, 100, 149, 0).await.unwrap();
        ledger.mark_requested(id, 1).await.unwrap();
        ledger.set_prover_request_id(id, "p".into()).await.unwrap();
        ledger.add_proof(id, b"a".to_vec()).await.unwrap();
        // gap: [150, 199] never completed

        let err = ledger.get_consecutive_span_proofs(100, 199).await.unwrap_err();
        assert!(matches!(err, Error::NoTilingCoverage { .. }));
    }

    // Scenario D from the spec: latest on-chain = 500, next required = 600; completed
    // spans [501,560], [561,600], [601,640] should yield an AGG [501, 640].
    #[tokio::test]
    async fn try_create_agg_from_spans_scenario_d() {
        let ledger = Ledger::open_in_memory().await.unwrap();

        for (start, end) in [(501u64, 560u64), (561, 600), (601, 640)] {
            let id = ledger.insert(RequestType::Span, start, end, 0).await.unwrap();
            ledger.mark_requested(id, 1).await.unwrap();
            ledger.set_prover_request_id(id, format!("p-{start}")).await.unwrap();
            ledger.add_proof(id, b"proof".to_vec()).await.unwrap();
        }

        let (created, end) = ledger.try_create_agg_from_spans(501, 600, 100).await.unwrap();
        assert!(created);
        assert_eq!(end, 640);

        let agg = ledger.next_unrequested().await.unwrap().unwrap();
        assert_eq!(agg.kind, RequestType::Agg);
        assert_eq!((agg.start_block, agg.end_block), (501, 640));
    }

    #[tokio::test]
    async fn try_create_agg_from_spans_gates_on_min_to() {
        let ledger = Ledger::open_in_memory().await.unwrap();
        let id = ledger.insert(RequestType::Span, 501, 560, 0).await.unwrap();
        ledger.mark_requested(id, 1).await.unwrap();
        ledger.set_prover_request_id(id, "p".into()).await.unwrap();
        ledger.add_proof(id, b"proof".to_vec()).await.unwrap();

        let (created, end) = ledger.try_create_agg_from_spans(501, 600, 100).await.unwrap();
        assert!(!created);
        assert_eq!(end, 0);
    }

    #[tokio::test]
    async fn max_span_end_block_and_range_exists() {
        let ledger = Ledger::open_in_memory().await.unwrap();
        assert_eq!(ledger.max_span_end_block().await.unwrap(), None);

        ledger.insert(RequestType::Span, 0, 99, 0).await.unwrap();
        ledger.insert(RequestType::Span, 100, 249, 0).await.unwrap();

        assert_eq!(ledger.max_span_end_block().await.unwrap(), Some(249));
        assert!(ledger.span_range_exists(100, 249).await.unwrap());
        assert!(!ledger.span_range_exists(100, 200).await.unwrap());
    }

    #[tokio::test]
    async fn try_create_agg_from_spans_requires_run_to_start_at_from() {
        let ledger = Ledger::open_in_memory().await.unwrap();
        // Completed span starts after `from`; there is a gap at the front.
        let id = ledger.insert(RequestType::Span, 510, 560, 0).await.unwrap();
        ledger.mark_requested(id, 1).await.unwrap();
        ledger.set_prover_request_id(id, "p".into()).await.unwrap();
        ledger.add_proof(id, b"proof".to_vec()).await.unwrap();

        let (created, _) = ledger.try_create_agg_from_spans(501, 560, 100).await.unwrap();
        assert!(!created);
    }
}
