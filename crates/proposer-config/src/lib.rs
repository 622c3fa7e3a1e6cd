//! Configuration loading for the proposer: the app's own `config.toml`, and the
//! per-chain rollup-config JSON files it reads out of `rollup_configs_dir`.

mod app_config;
mod bytes32;
mod error;
pub mod rollup_config;

pub use app_config::Config;
pub use bytes32::Bytes32;
pub use error::{Error, Result};
pub use rollup_config::{HexOrDecimal, RollupConfig};
