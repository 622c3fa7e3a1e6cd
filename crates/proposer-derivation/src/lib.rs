//! Span-range derivation (C2): turn an L2 block range into the list of L2 sub-ranges
//! that span proofs must cover, by reassembling L1 batch-channel frames.
//!
//! See [`RangeDeriver::derive`] for the algorithm; §4.2 of the specification walks it
//! step by step. Every RPC capability (rollup node, L1, beacon) is injected through the
//! narrow traits in [`traits`] — this crate never constructs its own HTTP client.

mod batch;
mod channel;
mod error;
mod frame;
mod scratch;
mod traits;

use std::path::PathBuf;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use proposer_config::RollupConfig;
use proposer_types::SpanBatchRange;
use tracing::{info, warn};

pub use batch::Batch;
pub use channel::Channel;
pub use error::{Error, Result};
pub use frame::{ChannelId, Frame};
pub use traits::{BeaconClient, InboxTransaction, L1Client, L2Output, RollupNodeClient};

/// How many L1 blocks' worth of frame fetches may be outstanding at once (§4.2 step 2).
const FETCH_CONCURRENCY: usize = 10;

/// Minutes of wall-clock the L1 search window is extended by, to give batch-posters
/// time to land their batches (§4.2 step 1).
const BATCH_POSTER_GRACE_SECS: u64 = 600;

pub struct RangeDeriver {
    rollup: Arc<dyn RollupNodeClient>,
    l1: Arc<dyn L1Client>,
    beacon: Arc<dyn BeaconClient>,
    config: RollupConfig,
    scratch_dir: PathBuf,
    batch_sender: String,
    batch_inbox: String,
    max_deviation_blocks: u64,
}

impl RangeDeriver {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        rollup: Arc<dyn RollupNodeClient>,
        l1: Arc<dyn L1Client>,
        beacon: Arc<dyn BeaconClient>,
        config: RollupConfig,
        scratch_dir: PathBuf,
        batch_sender: String,
        batch_inbox: String,
        max_deviation_blocks: u64,
    ) -> Self {
        Self {
            rollup,
            l1,
            beacon,
            config,
            scratch_dir,
            batch_sender,
            batch_inbox,
            max_deviation_blocks,
        }
    }

    /// Runs the full derivation algorithm for `[l2_start, l2_end]`.
    ///
    /// Not reentrant against the same scratch directory — the caller (the
    /// orchestrator) must serialize calls to this method (§4.2.1, §5).
    pub async fn derive(&self, l2_start: u64, l2_end: u64) -> Result<Vec<SpanBatchRange>> {
        let (l1_start, l1_end) = self.translate_search_bounds(l2_start, l2_end).await?;

        info!(l2_start, l2_end, l1_start, l1_end, "derivation search window");

        scratch::reset(&self.scratch_dir)?;
        self.fetch_frames(l1_start, l1_end).await?;

        let frames = scratch::read_all_frames(&self.scratch_dir)?;
        let channels = channel::reassemble(frames);

        let mut ranges = Vec::new();
        for (id, ch) in &channels {
            if !ch.is_ready() {
                continue;
            }
            if ch.invalid_frames() {
                warn!(channel = %id, "channel had rejected frames; proceeding with what reassembled");
            }

            let payload = ch.decompress().map_err(Error::from)?;
            let batches = match batch::decode_batches(&payload) {
                Some(batches) => batches,
                None => {
                    warn!(channel = %id, "unparseable batch stream, falling back to whole-range proof");
                    return Ok(vec![SpanBatchRange::new(l2_start, l2_end)]);
                }
            };

            if batches.is_empty() {
                return Err(Error::EmptyChannel(id.to_string()));
            }

            let mut channel_ranges = Vec::new();
            for b in &batches {
                if let batch::Batch::Span { batch_timestamp, block_count } = b {
                    match batch::span_batch_range(&self.config, *batch_timestamp, *block_count) {
                        Some(range) => channel_ranges.push(range),
                        None => {
                            warn!(channel = %id, "span batch with zero block count, falling back to whole-range proof");
                            return Ok(vec![SpanBatchRange::new(l2_start, l2_end)]);
                        }
                    }
                }
            }

            if channel_ranges.is_empty() {
                warn!(channel = %id, "channel contained only singular batches, contributing no span ranges");
            }

            ranges.extend(channel_ranges);
        }

        let clipped: Vec<SpanBatchRange> = ranges
            .into_iter()
            .filter_map(|r| r.clip(l2_start, l2_end))
            .collect();

        if clipped.is_empty() {
            return Err(Error::NoSpanBatch(l2_start));
        }

        Ok(clipped)
    }

    async fn translate_search_bounds(&self, l2_start: u64, l2_end: u64) -> Result<(u64, u64)> {
        let out_start = self.rollup.output_at_block(l2_start).await?;
        let out_end = self.rollup.output_at_block(l2_end).await?;

        let o_start = out_start.l1_origin_number;
        let o_end = out_end.l1_origin_number;

        let ts_start = self.l1.block_timestamp(o_start).await?;
        let ts_prev = self.l1.block_timestamp(o_start.saturating_sub(1)).await?;
        let l1_block_time = ts_start.saturating_sub(ts_prev).max(1);

        let extension = BATCH_POSTER_GRACE_SECS / l1_block_time;
        let l1_end = o_end + extension;

        let span = l1_end.saturating_sub(o_start);
        if span > self.max_deviation_blocks {
            return Err(Error::MaxDeviationExceeded { actual: span, max: self.max_deviation_blocks });
        }

        Ok((o_start, l1_end))
    }

    async fn fetch_frames(&self, l1_start: u64, l1_end: u64) -> Result<()> {
        let blocks: Vec<u64> = (l1_start..l1_end).collect();

        let results = stream::iter(blocks)
            .map(|block| self.fetch_block_frames(block))
            .buffer_unordered(FETCH_CONCURRENCY)
            .collect::<Vec<Result<()>>>()
            .await;

        for result in results {
            result?;
        }
        Ok(())
    }

    async fn fetch_block_frames(&self, l1_block: u64) -> Result<()> {
        let txs = self
            .l1
            .batch_inbox_transactions_at(&self.batch_sender, &self.batch_inbox, l1_block)
            .await?;

        let mut frame_index = 0usize;
        for tx in &txs {
            let bytes = if tx.data.is_empty() {
                // Blob-carrying transaction: frame bytes live in the beacon sidecar,
                // not calldata. `fetch_all=false` per §6.
                let sidecars = self.beacon.fetch_sidecars(l1_block, false).await?;
                sidecars.into_iter().next().unwrap_or_default()
            } else {
                tx.data.clone()
            };

            if let Some(frame) = Frame::decode(&bytes) {
                scratch::write_frame(&self.scratch_dir, l1_block, tx.tx_index, frame_index, &frame)?;
                frame_index += 1;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use flate2::{write::ZlibEncoder, Compression};
    use std::collections::HashMap;
    use std::io::Write;
    use std::sync::Mutex;

    fn sample_rollup_config() -> RollupConfig {
        let json = r#"{
            "genesis": {
                "l1": {"hash": "0xaa", "number": 0},
                "l2": {"hash": "0xbb", "number": 0},
                "l2_time": 1000
            },
            "block_time": 2,
            "max_sequencer_drift": 600,
            "seq_window_size": 3600,
            "l1_chain_id": 1,
            "l2_chain_id": 10,
            "batch_inbox_address": "0xcc",
            "batch_sender_address": "0xdd",
            "base_fee_params": {"max_change_denominator": 8, "elasticity_multiplier": 2},
            "canyon_base_fee_params": {"max_change_denominator": 8, "elasticity_multiplier": 2},
            "system_config": {
                "batcher_addr": "0xee",
                "overhead": "0x1",
                "scalar": "0x1",
                "gas_limit": 30000000
            }
        }"#;
        RollupConfig::from_json(json).unwrap()
    }

    struct FakeRollup {
        origins: HashMap<u64, u64>,
    }

    #[async_trait]
    impl RollupNodeClient for FakeRollup {
        async fn output_at_block(&self, l2_block: u64) -> Result<L2Output> {
            Ok(L2Output { l1_origin_number: self.origins[&l2_block] })
        }
        async fn safe_head(&self) -> Result<u64> {
            Ok(*self.origins.keys().max().unwrap())
        }
    }

    struct FakeL1 {
        timestamps: HashMap<u64, u64>,
        frames_by_block: Mutex<HashMap<u64, Vec<InboxTransaction>>>,
    }

    #[async_trait]
    impl L1Client for FakeL1 {
        async fn block_timestamp(&self, l1_block: u64) -> Result<u64> {
            Ok(*self.timestamps.get(&l1_block).unwrap_or(&0))
        }
        async fn batch_inbox_transactions_at(
            &self,
            _batch_sender: &str,
            _batch_inbox: &str,
            l1_block: u64,
        ) -> Result<Vec<InboxTransaction>> {
            Ok(self.frames_by_block.lock().unwrap().remove(&l1_block).unwrap_or_default())
        }
    }

    struct NoBlobs;

    #[async_trait]
    impl BeaconClient for NoBlobs {
        async fn fetch_sidecars(&self, _l1_block: u64, _fetch_all: bool) -> Result<Vec<Vec<u8>>> {
            Ok(vec![])
        }
    }

    fn compress(payload: &[u8]) -> Vec<u8> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(payload).unwrap();
        encoder.finish().unwrap()
    }

    fn encode_span_batch(ts: u64, count: u32) -> Vec<u8> {
        let mut out = vec![1u8]; // SPAN_TAG, kept in sync with batch.rs
        out.extend_from_slice(&ts.to_be_bytes());
        out.extend_from_slice(&count.to_be_bytes());
        out
    }

    #[tokio::test]
    async fn derive_returns_clipped_span_range_from_single_channel() {
        let scratch = tempfile::tempdir().unwrap();
        let config = sample_rollup_config();

        // One span batch covering L2 [5, 9] (t2b(1010) = (1010-1000)/2 + 0 = 5, n=5).
        let payload = encode_span_batch(1010, 5);
        let compressed = compress(&payload);

        let frame = Frame { channel_id: ChannelId([1; 16]), frame_number: 0, data: compressed, is_last: true };

        let mut frames_by_block = HashMap::new();
        frames_by_block.insert(100u64, vec![InboxTransaction { tx_index: 0, data: frame.encode() }]);

        let rollup = FakeRollup { origins: HashMap::from([(0u64, 100u64), (20u64, 100u64)]) };
        let l1 = FakeL1 {
            timestamps: HashMap::from([(100u64, 2000u64), (99u64, 1988u64)]),
            frames_by_block: Mutex::new(frames_by_block),
        };

        let deriver = RangeDeriver::new(
            Arc::new(rollup),
            Arc::new(l1),
            Arc::new(NoBlobs),
            config,
            scratch.path().to_path_buf(),
            "0xdd".into(),
            "0xcc".into(),
            10_000,
        );

        let ranges = deriver.derive(0, 20).await.unwrap();
        assert_eq!(ranges, vec![SpanBatchRange::new(5, 9)]);
    }

    #[tokio::test]
    async fn derive_fails_with_no_span_batch_when_nothing_covers_the_range() {
        let scratch = tempfile::tempdir().unwrap();
        let config = sample_rollup_config();

        let rollup = FakeRollup { origins: HashMap::from([(0u64, 100u64), (20u64, 100u64)]) };
        let l1 = FakeL1 {
            timestamps: HashMap::from([(100u64, 2000u64), (99u64, 1988u64)]),
            frames_by_block: Mutex::new(HashMap::new()),
        };

        let deriver = RangeDeriver::new(
            Arc::new(rollup),
            Arc::new(l1),
            Arc::new(NoBlobs),
            config,
            scratch.path().to_path_buf(),
            "0xdd".into(),
            "0xcc".into(),
            10_000,
        );

        let err = deriver.derive(0, 20).await.unwrap_err();
        assert!(matches!(err, Error::NoSpanBatch(_)));
    }

    // Scenario F from the spec: l1_block_time=12s extends an L1 origin end of X to X+50.
    #[tokio::test]
    async fn search_bound_extension_matches_scenario_f() {
        let scratch = tempfile::tempdir().unwrap();
        let config = sample_rollup_config();

        let rollup = FakeRollup { origins: HashMap::from([(0u64, 1_000u64), (20u64, 1_200u64)]) };
        let l1 = FakeL1 {
            timestamps: HashMap::from([(1_000u64, 12_000u64), (999u64, 11_988u64)]),
            frames_by_block: Mutex::new(HashMap::new()),
        };

        let deriver = RangeDeriver::new(
            Arc::new(rollup),
            Arc::new(l1),
            Arc::new(NoBlobs),
            config,
            scratch.path().to_path_buf(),
            "0xdd".into(),
            "0xcc".into(),
            10_000,
        );

        let (l1_start, l1_end) = deriver.translate_search_bounds(0, 20).await.unwrap();
        assert_eq!(l1_start, 1_000);
        assert_eq!(l1_end, 1_200 + 50); // floor(600/12) == 50
    }

    #[tokio::test]
    async fn max_deviation_exceeded_is_surfaced_distinctly() {
        let scratch = tempfile::tempdir().unwrap();
        let config = sample_rollup_config();

        let rollup = FakeRollup { origins: HashMap::from([(0u64, 1_000u64), (20u64, 1_200u64)]) };
        let l1 = FakeL1 {
            timestamps: HashMap::from([(1_000u64, 12_000u64), (999u64, 11_988u64)]),
            frames_by_block: Mutex::new(HashMap::new()),
        };

        let deriver = RangeDeriver::new(
            Arc::new(rollup),
            Arc::new(l1),
            Arc::new(NoBlobs),
            config,
            scratch.path().to_path_buf(),
            "0xdd".into(),
            "0xcc".into(),
            100, // far below the 200+ block span this window needs
        );

        let err = deriver.translate_search_bounds(0, 20).await.unwrap_err();
        assert!(matches!(err, Error::MaxDeviationExceeded { .. }));
    }
}
