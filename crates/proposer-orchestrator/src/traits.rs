//! Capability traits for the orchestrator's remaining out-of-scope collaborators:
//! the on-chain output oracle (§6) and the L1 checkpoint operation Pass B's step 2
//! calls before requesting an `AGG` proof (§4.4). Both are read/write interfaces the
//! spec treats as external; concrete contract-binding implementations are injected.

use async_trait::async_trait;

/// Read operations against the output oracle contract (§6). Implementors are contract
/// bindings, out of scope for this crate — the trait boundary uses `anyhow::Result`
/// the way the teacher's own contract-facing call sites do, rather than forcing every
/// implementor to construct this crate's own [`crate::error::Error`].
#[async_trait]
pub trait OutputOracle: Send + Sync {
    /// The highest L2 block number with a posted, proved output.
    async fn latest_block_number(&self) -> anyhow::Result<u64>;

    /// The next L2 block number the contract will accept a proof for.
    async fn next_block_number(&self) -> anyhow::Result<u64>;
}

/// An L1 checkpoint: the block an `AGG` proof is anchored to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct L1Checkpoint {
    pub number: u64,
    pub hash: String,
}

/// Out-of-scope operation that records/reads the L1 block an `AGG` proof should anchor
/// to (§4.4 Pass B step 2, §9's "Checkpoint" glossary entry).
#[async_trait]
pub trait CheckpointProvider: Send + Sync {
    async fn checkpoint(&self) -> anyhow::Result<L1Checkpoint>;
}
