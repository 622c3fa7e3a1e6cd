//! The proposer's own TOML application config.
//!
//! Loaded the same way `execution-witness-sentry::Config::load` reads its endpoint
//! list: `std::fs::read_to_string` mapped into a typed [`Error::Read`], then parsed
//! with `toml::from_str`. Unlike the rollup-config JSON (external wire format, out of
//! scope for hand-tuned ergonomics) this file is entirely ours, so it gets plain
//! `serde(default)` conveniences where that keeps a config file terse.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

fn default_tick_interval_secs() -> u64 {
    10
}

fn default_proof_timeout_secs() -> u64 {
    3600
}

fn default_max_concurrent_span_requests() -> usize {
    10
}

/// The proposer's `config.toml`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Base URL of the prover HTTP service, e.g. `http://localhost:3000`.
    pub prover_base_url: String,

    /// How long a `REQ` record may sit unanswered before pass A marks it `FAILED`.
    #[serde(default = "default_proof_timeout_secs")]
    pub proof_timeout_secs: u64,

    /// Cap on `SPAN` requests simultaneously in flight (pass B's concurrency cap).
    #[serde(default = "default_max_concurrent_span_requests")]
    pub max_concurrent_span_requests: usize,

    /// Orchestrator tick period.
    #[serde(default = "default_tick_interval_secs")]
    pub tick_interval_secs: u64,

    /// L1 execution-layer JSON-RPC endpoint.
    pub l1_rpc_url: String,

    /// L2 (rollup node) JSON-RPC endpoint.
    pub l2_rpc_url: String,

    /// Beacon-chain endpoint used to fetch blob sidecars for EIP-4844 batches.
    pub beacon_rpc_url: String,

    /// Address the batcher posts frames to on L1.
    pub batch_inbox_address: String,

    /// Address expected to be the `from` of batch-inbox transactions.
    pub batch_sender_address: String,

    /// Address of the on-chain output oracle Pass D/C read from and Pass B's `AGG`
    /// requests are ultimately proved against.
    pub output_oracle_address: String,

    /// L2 chain id, used to pick `<l2_chain_id>.json` out of `rollup_configs_dir`.
    pub l2_chain_id: u64,

    /// Directory containing `<chain_id>.json` rollup config files.
    pub rollup_configs_dir: PathBuf,

    /// Path to the sqlite database file backing the ledger.
    pub sqlite_path: PathBuf,

    /// Scratch directory used for frame/channel reassembly during derivation.
    pub scratch_dir: PathBuf,
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| Error::Read {
            path: path.display().to_string(),
            source,
        })?;
        Ok(toml::from_str(&content)?)
    }

    pub fn proof_timeout(&self) -> Duration {
        Duration::from_secs(self.proof_timeout_secs)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_secs)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn round_trips_through_toml() {
        let toml_str = r#"
            prover_base_url = "http://localhost:3000"
            l1_rpc_url = "http://localhost:8545"
            l2_rpc_url = "http://localhost:9545"
            beacon_rpc_url = "http://localhost:5052"
            batch_inbox_address = "0x0000000000000000000000000000000000ff00"
            batch_sender_address = "0x0000000000000000000000000000000000ff01"
            output_oracle_address = "0x0000000000000000000000000000000000ff02"
            l2_chain_id = 10
            rollup_configs_dir = "./rollup-configs"
            sqlite_path = "./data/proposer.sqlite"
            scratch_dir = "./data/scratch"
        "#;
        let cfg: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(cfg.proof_timeout_secs, default_proof_timeout_secs());
        assert_eq!(cfg.tick_interval_secs, default_tick_interval_secs());
        assert_eq!(
            cfg.max_concurrent_span_requests,
            default_max_concurrent_span_requests()
        );

        let reserialized = toml::to_string(&cfg).unwrap();
        let reparsed: Config = toml::from_str(&reserialized).unwrap();
        assert_eq!(reparsed.prover_base_url, cfg.prover_base_url);
    }

    #[test]
    fn missing_config_file_surfaces_read_error() {
        let err = Config::load("/nonexistent/path/config.toml").unwrap_err();
        assert!(matches!(err, Error::Read { .. }));
    }
}
