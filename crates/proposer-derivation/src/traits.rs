//! Narrow, read-only capability traits consumed by [`crate::RangeDeriver`].
//!
//! The rollup node, L1 execution, and L1 beacon clients are out-of-scope collaborators
//! per the specification — concrete `reqwest`/JSON-RPC implementations live outside this
//! crate and are injected as `Arc<dyn Trait>`. Keeping the surface this narrow (one
//! method per capability the deriver actually calls) is what lets tests substitute
//! in-memory fakes instead of spinning up real RPC servers.

use async_trait::async_trait;

use crate::error::Result;

/// The L2 output embedded at a given block, as needed by search-bound translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct L2Output {
    /// The L1 origin block number this L2 output derives from.
    pub l1_origin_number: u64,
}

/// Read-only capability the deriver needs from the L2 rollup node.
#[async_trait]
pub trait RollupNodeClient: Send + Sync {
    /// Fetches the L2 output (and embedded L1 origin) at `l2_block`.
    async fn output_at_block(&self, l2_block: u64) -> Result<L2Output>;

    /// The highest L2 block the rollup node considers safe (derived from finalized L1 data).
    async fn safe_head(&self) -> Result<u64>;
}

/// One frame-bearing L1 transaction sent to the batch inbox.
#[derive(Debug, Clone)]
pub struct InboxTransaction {
    pub tx_index: u32,
    /// Calldata frame bytes. Empty for a blob-carrying transaction — its frame bytes
    /// are fetched separately via [`BeaconClient::fetch_sidecars`].
    pub data: Vec<u8>,
}

/// Read-only capability the deriver needs from an L1 execution client.
#[async_trait]
pub trait L1Client: Send + Sync {
    /// The unix timestamp of `l1_block`.
    async fn block_timestamp(&self, l1_block: u64) -> Result<u64>;

    /// Every transaction sent by `batch_sender` to `batch_inbox` at `l1_block`.
    async fn batch_inbox_transactions_at(
        &self,
        batch_sender: &str,
        batch_inbox: &str,
        l1_block: u64,
    ) -> Result<Vec<InboxTransaction>>;
}

/// Read-only capability the deriver needs from the L1 beacon (consensus) client, used to
/// resolve EIP-4844 blob sidecars referenced by batch-inbox transactions.
#[async_trait]
pub trait BeaconClient: Send + Sync {
    /// Fetches the blob sidecars for `l1_block`. `fetch_all` is always `false` per §6 —
    /// only sidecars actually referenced by a batch-inbox transaction are requested.
    async fn fetch_sidecars(&self, l1_block: u64, fetch_all: bool) -> Result<Vec<Vec<u8>>>;
}
