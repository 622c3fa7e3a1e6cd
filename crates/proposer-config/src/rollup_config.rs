//! Per-chain rollup configuration, loaded from `rollup-configs/<chain_id>.json`.
//!
//! Mirrors the subset of an op-stack `rollup.json` that derivation needs to map
//! L1 origins to L2 block boundaries and to recognize the batch-inbox/system-config
//! addresses. Several numeric fields arrive either hex- or decimal-encoded upstream;
//! [`HexOrDecimal`] accepts both. `system_config.overhead`/`system_config.scalar` are
//! 32-byte values that may arrive minimal-length hex; see [`crate::bytes32::Bytes32`].

use serde::{de::Error as _, Deserialize, Deserializer};

use crate::bytes32::Bytes32;

/// A `u64` that deserializes from either a `"0x…"` hex string or a decimal JSON number/string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HexOrDecimal(pub u64);

impl<'de> Deserialize<'de> for HexOrDecimal {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Number(u64),
            Text(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Number(n) => Ok(HexOrDecimal(n)),
            Repr::Text(s) => {
                let parsed = match s.strip_prefix("0x") {
                    Some(hex) => u64::from_str_radix(hex, 16),
                    None => s.parse::<u64>(),
                };
                parsed
                    .map(HexOrDecimal)
                    .map_err(|_| D::Error::custom(format!("'{s}' is not valid hex or decimal")))
            }
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChainPoint {
    pub hash: String,
    pub number: HexOrDecimal,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Genesis {
    pub l1: ChainPoint,
    pub l2: ChainPoint,
    pub l2_time: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BaseFeeParams {
    pub max_change_denominator: HexOrDecimal,
    pub elasticity_multiplier: HexOrDecimal,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SystemConfig {
    pub batcher_addr: String,
    pub overhead: Bytes32,
    pub scalar: Bytes32,
    pub gas_limit: u64,
}

/// The derivation-relevant subset of a per-chain `rollup.json`.
#[derive(Debug, Clone, Deserialize)]
pub struct RollupConfig {
    pub genesis: Genesis,
    pub block_time: u64,
    pub max_sequencer_drift: u64,
    pub seq_window_size: u64,
    pub l1_chain_id: u64,
    pub l2_chain_id: u64,
    pub batch_inbox_address: String,
    pub batch_sender_address: String,
    pub base_fee_params: BaseFeeParams,
    pub canyon_base_fee_params: BaseFeeParams,
    pub system_config: SystemConfig,
}

impl RollupConfig {
    pub fn from_json(s: &str) -> crate::error::Result<Self> {
        Ok(serde_json::from_str(s)?)
    }

    /// Maps an L2 block timestamp to its L2 block number, per `t2b` in the derivation spec.
    pub fn timestamp_to_block(&self, timestamp: u64) -> u64 {
        let l2_genesis_time = self.genesis.l2_time;
        let l2_genesis_block = self.genesis.l2.number.0;
        (timestamp.saturating_sub(l2_genesis_time)) / self.block_time + l2_genesis_block
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_json(overhead: &str, scalar: &str, l1_number: &str) -> String {
        format!(
            r#"{{
                "genesis": {{
                    "l1": {{"hash": "0xaa", "number": {l1_number}}},
                    "l2": {{"hash": "0xbb", "number": 0}},
                    "l2_time": 1700000000
                }},
                "block_time": 2,
                "max_sequencer_drift": 600,
                "seq_window_size": 3600,
                "l1_chain_id": 1,
                "l2_chain_id": 10,
                "batch_inbox_address": "0xcc",
                "batch_sender_address": "0xdd",
                "base_fee_params": {{"max_change_denominator": "0x8", "elasticity_multiplier": 2}},
                "canyon_base_fee_params": {{"max_change_denominator": 250, "elasticity_multiplier": 6}},
                "system_config": {{
                    "batcher_addr": "0xee",
                    "overhead": "{overhead}",
                    "scalar": "{scalar}",
                    "gas_limit": 30000000
                }}
            }}"#
        )
    }

    #[test]
    fn hex_and_decimal_numbers_agree() {
        let hex_json = sample_json("0x1", "0x1", "0x64");
        let dec_json = sample_json("0x1", "0x1", "100");

        let hex_cfg = RollupConfig::from_json(&hex_json).unwrap();
        let dec_cfg = RollupConfig::from_json(&dec_json).unwrap();

        assert_eq!(hex_cfg.genesis.l1.number.0, 100);
        assert_eq!(hex_cfg.genesis.l1.number.0, dec_cfg.genesis.l1.number.0);
        assert_eq!(hex_cfg.base_fee_params.max_change_denominator.0, 8);
    }

    #[test]
    fn system_config_scalar_accepts_minimal_hex() {
        let json = sample_json("0x1", "0x2a", "0");
        let cfg = RollupConfig::from_json(&json).unwrap();
        let expected = Bytes32::decode("scalar", &format!("0x{}2a", "0".repeat(62))).unwrap();
        assert_eq!(cfg.system_config.scalar, expected);
    }

    #[test]
    fn timestamp_to_block_matches_spec_formula() {
        let cfg = RollupConfig::from_json(&sample_json("0x1", "0x1", "0")).unwrap();
        // l2_genesis_time = 1_700_000_000, l2_genesis_block = 0, block_time = 2
        assert_eq!(cfg.timestamp_to_block(1_700_000_000), 0);
        assert_eq!(cfg.timestamp_to_block(1_700_000_010), 5);
    }
}
