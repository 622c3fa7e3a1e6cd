//! The Proof Orchestrator (C4): the single struct that owns every collaborator and
//! drives the per-record state machine described in §4.4.
//!
//! No hidden process-wide state (§9): everything a tick needs — the ledger, the
//! prover gateway, the range deriver, and the two remaining out-of-scope collaborators
//! (the output oracle and the checkpoint provider) — is a field on [`Orchestrator`],
//! constructed once and passed through every tick.

use std::sync::Arc;
use std::time::{Duration, Instant};

use proposer_derivation::RangeDeriver;
use proposer_derivation::RollupNodeClient;
use proposer_ledger::Ledger;
use proposer_types::{now_secs, RequestStatus, RequestType};
use prover_gateway::{ProofStatus, ProverGateway};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::error::{Error, Result};
use crate::metrics;
use crate::retry;
use crate::traits::{CheckpointProvider, L1Checkpoint, OutputOracle};

/// Tuning knobs the orchestrator needs beyond what's already baked into its
/// collaborators (the gateway's own request/poll timeouts, the deriver's own
/// max-deviation cap).
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// How long a `REQ` record may sit unanswered before Pass A fails it (§4.4, §5).
    pub proof_timeout: Duration,
    /// Cap on simultaneously `REQ` `SPAN` records (§3 invariant 5, §4.4 Pass B).
    pub max_concurrent_span_requests: u64,
    /// Period of the main tick loop.
    pub tick_interval: Duration,
}

pub struct Orchestrator {
    ledger: Ledger,
    gateway: ProverGateway,
    deriver: RangeDeriver,
    rollup: Arc<dyn RollupNodeClient>,
    output_oracle: Arc<dyn OutputOracle>,
    checkpoint_provider: Arc<dyn CheckpointProvider>,
    config: OrchestratorConfig,
}

impl Orchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        ledger: Ledger,
        gateway: ProverGateway,
        deriver: RangeDeriver,
        rollup: Arc<dyn RollupNodeClient>,
        output_oracle: Arc<dyn OutputOracle>,
        checkpoint_provider: Arc<dyn CheckpointProvider>,
        config: OrchestratorConfig,
    ) -> Self {
        Self { ledger, gateway, deriver, rollup, output_oracle, checkpoint_provider, config }
    }

    /// Spawns the tick loop as a background task bound to `shutdown_token`, following
    /// the teacher's `BackfillService::spawn`/`ProofService::spawn` pattern (§5.1):
    /// the binary cancels the token on `SIGTERM`/`SIGINT` and awaits the returned
    /// handle so an in-flight ledger transaction finishes rather than being killed.
    pub fn spawn(self: Arc<Self>, shutdown_token: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(shutdown_token).await })
    }

    async fn run(self: Arc<Self>, shutdown_token: CancellationToken) {
        let mut interval = tokio::time::interval(self.config.tick_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        info!(tick_interval = ?self.config.tick_interval, "orchestrator started");

        loop {
            tokio::select! {
                biased;

                _ = shutdown_token.cancelled() => {
                    info!("orchestrator received shutdown signal");
                    break;
                }

                _ = interval.tick() => {
                    if let Err(e) = self.tick().await {
                        error!(error = %e, "tick failed; remaining records keep their prior state and are re-considered next tick");
                    }
                }
            }
        }

        info!("orchestrator stopped");
    }

    /// Runs passes A, B, D, C once, in that order (§4.4, §5). Each pass is idempotent
    /// and safe to interleave with the next tick's run of the same pass.
    pub async fn tick(&self) -> Result<()> {
        let started = Instant::now();

        self.pass_a_process_pending_proofs().await?;
        self.pass_b_request_queued_proofs().await?;
        self.pass_d_derive_span_ranges().await?;
        self.pass_c_derive_agg_proofs().await?;

        self.record_ledger_gauges().await;
        metrics::record_tick_duration(started.elapsed());
        Ok(())
    }

    async fn record_ledger_gauges(&self) {
        for status in [
            RequestStatus::Unrequested,
            RequestStatus::Requested,
            RequestStatus::Complete,
            RequestStatus::Failed,
        ] {
            if let Ok(count) = self.ledger.count_by_status(status).await {
                metrics::record_ledger_status_count(status.as_str(), count);
            }
        }
    }

    /// Pass A — ProcessPendingProofs (§4.4).
    async fn pass_a_process_pending_proofs(&self) -> Result<()> {
        let now = now_secs();

        for record in self.ledger.get_failed_on_server().await? {
            info!(id = record.id, start = record.start_block, end = record.end_block, "retrying failed-on-server record");
            retry::retry(&self.ledger, now, &record).await?;
        }

        for record in self.ledger.get_all_pending().await? {
            let poll_started = Instant::now();
            let poll_result = self.gateway.get_status(&record.prover_request_id).await;
            metrics::record_prover_request_duration("status", poll_started.elapsed());

            let (status, proof) = match poll_result {
                Ok(result) => result,
                Err(e) => {
                    warn!(id = record.id, prover_request_id = %record.prover_request_id, error = %e, "status poll failed, will retry next tick");
                    continue;
                }
            };

            match status {
                ProofStatus::Fulfilled => {
                    self.ledger.add_proof(record.id, proof).await?;
                    info!(id = record.id, "proof fulfilled");
                }
                ProofStatus::Unclaimed => {
                    self.fail_and_retry(&record, now).await?;
                }
                ProofStatus::Pending => {
                    let deadline = record.proof_request_time + self.config.proof_timeout.as_secs();
                    if now > deadline {
                        warn!(id = record.id, requested_at = record.proof_request_time, now, "proof timed out");
                        self.fail_and_retry(&record, now).await?;
                    }
                }
            }
        }

        Ok(())
    }

    async fn fail_and_retry(&self, record: &proposer_types::ProofRequest, now: u64) -> Result<()> {
        self.ledger.update_status(record.id, RequestStatus::Failed).await?;
        retry::retry(&self.ledger, now, record).await?;
        Ok(())
    }

    /// Pass B — RequestQueuedProofs (§4.4). Dispatches the prover RPC on a background
    /// task so a slow request cannot stall the next tick's polling (§5).
    async fn pass_b_request_queued_proofs(&self) -> Result<()> {
        let Some(record) = self.ledger.next_unrequested().await? else {
            return Ok(());
        };

        if record.is_agg() && !record.has_l1_checkpoint() {
            let checkpoint = self
                .checkpoint_provider
                .checkpoint()
                .await
                .map_err(Error::Checkpoint)?;
            self.ledger
                .attach_l1_checkpoint(record.start_block, record.end_block, checkpoint.number, checkpoint.hash)
                .await?;
            info!(id = record.id, l1_number = checkpoint.number, "attached L1 checkpoint; requesting next tick");
            return Ok(());
        }

        if record.is_span() {
            let in_flight = self.ledger.count_by_status(RequestStatus::Requested).await?;
            if in_flight >= self.config.max_concurrent_span_requests {
                return Ok(());
            }
        }

        let now = now_secs();
        self.ledger.mark_requested(record.id, now).await?;

        let ledger = self.ledger.clone();
        let gateway = self.gateway.clone();
        tokio::spawn(async move {
            let request_started = Instant::now();
            let operation = if record.is_span() { "request_span_proof" } else { "request_agg_proof" };

            let result = if record.is_span() {
                gateway.request_span_proof(record.start_block, record.end_block).await
            } else {
                match ledger.get_consecutive_span_proofs(record.start_block, record.end_block).await {
                    Ok(subproofs) => gateway.request_agg_proof(subproofs, record.l1_block_hash.clone()).await,
                    Err(e) => {
                        error!(id = record.id, error = %e, "could not collect span proofs for AGG request");
                        return;
                    }
                }
            };
            metrics::record_prover_request_duration(operation, request_started.elapsed());

            match result {
                Ok(prover_request_id) => {
                    if let Err(e) = ledger.set_prover_request_id(record.id, prover_request_id).await {
                        error!(id = record.id, error = %e, "failed to record prover_request_id");
                    }
                }
                Err(e) => {
                    warn!(id = record.id, error = %e, "prover rejected request");
                    if let Err(e) = ledger.update_status(record.id, RequestStatus::Failed).await {
                        error!(id = record.id, error = %e, "failed to mark record failed");
                        return;
                    }
                    if let Err(e) = retry::retry(&ledger, now_secs(), &record).await {
                        error!(id = record.id, error = %e, "retry policy failed");
                    }
                }
            }
        });

        Ok(())
    }

    /// Pass D — DeriveSpanRanges (ADDED, §4.4): seeds fresh `UNREQ` `SPAN` rows for
    /// newly-finalized L2 ranges, ahead of Pass C so there is something to aggregate.
    async fn pass_d_derive_span_ranges(&self) -> Result<()> {
        let l2_safe_head = self.rollup.safe_head().await?;
        let next_required = self
            .output_oracle
            .next_block_number()
            .await
            .map_err(Error::OutputOracle)?;

        let highest_existing = self.ledger.max_span_end_block().await?;
        let derive_from = next_required.max(highest_existing.map_or(0, |e| e + 1));

        if derive_from > l2_safe_head {
            return Ok(());
        }

        let derive_started = Instant::now();
        let derive_result = self.deriver.derive(derive_from, l2_safe_head).await;
        metrics::record_derivation_duration(derive_started.elapsed());

        let ranges = match derive_result {
            Ok(ranges) => ranges,
            Err(proposer_derivation::Error::MaxDeviationExceeded { actual, max }) => {
                warn!(actual, max, "derivation exceeded max deviation; retrying next tick");
                return Ok(());
            }
            Err(proposer_derivation::Error::NoSpanBatch(block)) => {
                warn!(block, "no span batch covers the requested range; retrying next tick");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        let now = now_secs();
        for range in ranges {
            if self.ledger.span_range_exists(range.start, range.end).await? {
                continue;
            }
            let id = self.ledger.insert(RequestType::Span, range.start, range.end, now).await?;
            info!(id, start = range.start, end = range.end, "derived new SPAN range");
        }

        Ok(())
    }

    /// Pass C — DeriveAggProofs (§4.4).
    async fn pass_c_derive_agg_proofs(&self) -> Result<()> {
        let latest = self
            .output_oracle
            .latest_block_number()
            .await
            .map_err(Error::OutputOracle)?;
        let min_to = self
            .output_oracle
            .next_block_number()
            .await
            .map_err(Error::OutputOracle)?;

        let from = latest + 1;
        let now = now_secs();
        let (created, end) = self.ledger.try_create_agg_from_spans(from, min_to, now).await?;
        if created {
            info!(from, end, "created AGG record from consecutive span proofs");
        }
        Ok(())
    }
}
