//! JSON-RPC and beacon-API clients wiring the library crates' capability traits to real
//! endpoints. Modeled on `execution-witness-sentry::rpc::ElClient`: a thin envelope
//! struct, one public method per capability, a private `call` helper that raises
//! [`crate::error::Error::Rpc`] on a JSON-RPC error object.

use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

use proposer_derivation::{BeaconClient, InboxTransaction, L1Client, L2Output, RollupNodeClient};
use proposer_orchestrator::{CheckpointProvider, L1Checkpoint, OutputOracle};

use crate::error::{Error, Result};

#[derive(Debug, Serialize)]
struct JsonRpcRequest<P> {
    jsonrpc: &'static str,
    method: &'static str,
    params: P,
    id: u64,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse<R> {
    result: Option<R>,
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

/// A bare JSON-RPC 2.0 transport, shared by the L1, L2 and output-oracle clients below.
#[derive(Debug, Clone)]
struct JsonRpcClient {
    url: String,
    http: Client,
}

impl JsonRpcClient {
    fn new(url: impl Into<String>) -> Self {
        Self { url: url.into(), http: Client::new() }
    }

    async fn call<P, R>(&self, method: &'static str, params: P) -> Result<R>
    where
        P: Serialize,
        R: DeserializeOwned,
    {
        let request = JsonRpcRequest { jsonrpc: "2.0", method, params, id: 1 };
        let response: JsonRpcResponse<R> =
            self.http.post(&self.url).json(&request).send().await?.json().await?;

        if let Some(error) = response.error {
            return Err(Error::Rpc { code: error.code, message: error.message });
        }
        response.result.ok_or(Error::BadResponse { method, detail: "missing result".into() })
    }
}

fn hex_to_u64(s: &str, method: &'static str) -> Result<u64> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    u64::from_str_radix(digits, 16)
        .map_err(|e| Error::BadResponse { method, detail: e.to_string() })
}

/// L1 execution-layer JSON-RPC client backing [`L1Client`].
#[derive(Debug, Clone)]
pub struct L1RpcClient {
    rpc: JsonRpcClient,
}

impl L1RpcClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self { rpc: JsonRpcClient::new(url) }
    }
}

#[async_trait]
impl L1Client for L1RpcClient {
    async fn block_timestamp(&self, l1_block: u64) -> proposer_derivation::Result<u64> {
        let block: Value = self
            .rpc
            .call("eth_getBlockByNumber", (format!("0x{l1_block:x}"), false))
            .await
            .map_err(|e| proposer_derivation::Error::Rpc(e.to_string()))?;

        let timestamp = block
            .get("timestamp")
            .and_then(Value::as_str)
            .ok_or_else(|| proposer_derivation::Error::Rpc("block missing timestamp".into()))?;
        hex_to_u64(timestamp, "eth_getBlockByNumber")
            .map_err(|e| proposer_derivation::Error::Rpc(e.to_string()))
    }

    async fn batch_inbox_transactions_at(
        &self,
        batch_sender: &str,
        batch_inbox: &str,
        l1_block: u64,
    ) -> proposer_derivation::Result<Vec<InboxTransaction>> {
        let block: Value = self
            .rpc
            .call("eth_getBlockByNumber", (format!("0x{l1_block:x}"), true))
            .await
            .map_err(|e| proposer_derivation::Error::Rpc(e.to_string()))?;

        let transactions = block.get("transactions").and_then(Value::as_array).cloned().unwrap_or_default();

        let mut out = Vec::new();
        for tx in transactions {
            let from = tx.get("from").and_then(Value::as_str).unwrap_or_default();
            let to = tx.get("to").and_then(Value::as_str).unwrap_or_default();
            if !from.eq_ignore_ascii_case(batch_sender) || !to.eq_ignore_ascii_case(batch_inbox) {
                continue;
            }

            let tx_index = tx
                .get("transactionIndex")
                .and_then(Value::as_str)
                .map(|s| hex_to_u64(s, "eth_getBlockByNumber"))
                .transpose()
                .map_err(|e| proposer_derivation::Error::Rpc(e.to_string()))?
                .unwrap_or(0) as u32;

            let input = tx.get("input").and_then(Value::as_str).unwrap_or("0x");
            let is_blob_tx = tx.get("blobVersionedHashes").is_some();
            let data = if is_blob_tx {
                Vec::new()
            } else {
                hex::decode(input.strip_prefix("0x").unwrap_or(input))
                    .map_err(|e| proposer_derivation::Error::Rpc(e.to_string()))?
            };

            out.push(InboxTransaction { tx_index, data });
        }
        Ok(out)
    }
}

/// L2 rollup-node JSON-RPC client backing [`RollupNodeClient`], speaking the op-stack
/// `optimism_*` namespace.
#[derive(Debug, Clone)]
pub struct RollupRpcClient {
    rpc: JsonRpcClient,
}

impl RollupRpcClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self { rpc: JsonRpcClient::new(url) }
    }
}

#[async_trait]
impl RollupNodeClient for RollupRpcClient {
    async fn output_at_block(&self, l2_block: u64) -> proposer_derivation::Result<L2Output> {
        let result: Value = self
            .rpc
            .call("optimism_outputAtBlock", (format!("0x{l2_block:x}"),))
            .await
            .map_err(|e| proposer_derivation::Error::Rpc(e.to_string()))?;

        let l1_origin_number = result
            .pointer("/blockRef/l1origin/number")
            .and_then(Value::as_u64)
            .ok_or_else(|| proposer_derivation::Error::Rpc("output missing l1origin.number".into()))?;
        Ok(L2Output { l1_origin_number })
    }

    async fn safe_head(&self) -> proposer_derivation::Result<u64> {
        let result: Value = self
            .rpc
            .call("optimism_syncStatus", Vec::<Value>::new())
            .await
            .map_err(|e| proposer_derivation::Error::Rpc(e.to_string()))?;

        result
            .pointer("/safe_l2/number")
            .and_then(Value::as_u64)
            .ok_or_else(|| proposer_derivation::Error::Rpc("sync status missing safe_l2.number".into()))
    }
}

/// Beacon-chain HTTP client backing [`BeaconClient`], fetching EIP-4844 blob sidecars.
#[derive(Debug, Clone)]
pub struct BeaconHttpClient {
    base_url: String,
    http: Client,
}

impl BeaconHttpClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { base_url: base_url.into(), http: Client::new() }
    }
}

#[async_trait]
impl BeaconClient for BeaconHttpClient {
    async fn fetch_sidecars(&self, l1_block: u64, _fetch_all: bool) -> proposer_derivation::Result<Vec<Vec<u8>>> {
        let url = format!("{}/eth/v1/beacon/blob_sidecars/{}", self.base_url, l1_block);
        let body: Value = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| proposer_derivation::Error::Rpc(e.to_string()))?
            .json()
            .await
            .map_err(|e| proposer_derivation::Error::Rpc(e.to_string()))?;

        let sidecars = body.get("data").and_then(Value::as_array).cloned().unwrap_or_default();
        sidecars
            .iter()
            .map(|sidecar| {
                let blob = sidecar
                    .get("blob")
                    .and_then(Value::as_str)
                    .ok_or_else(|| proposer_derivation::Error::Rpc("sidecar missing blob field".into()))?;
                hex::decode(blob.strip_prefix("0x").unwrap_or(blob))
                    .map_err(|e| proposer_derivation::Error::Rpc(e.to_string()))
            })
            .collect()
    }
}

/// Reads `latestBlockNumber()`/`nextBlockNumber()` off the on-chain output oracle via
/// raw `eth_call` — this binary carries no ABI-codegen dependency, so selectors are
/// precomputed `keccak256(signature)[..4]` constants rather than macro-generated.
#[derive(Debug, Clone)]
pub struct OutputOracleRpcClient {
    rpc: JsonRpcClient,
    oracle_address: String,
}

const SELECTOR_LATEST_BLOCK_NUMBER: &str = "0x4599c788";
const SELECTOR_NEXT_BLOCK_NUMBER: &str = "0x73857fa3";

impl OutputOracleRpcClient {
    pub fn new(url: impl Into<String>, oracle_address: impl Into<String>) -> Self {
        Self { rpc: JsonRpcClient::new(url), oracle_address: oracle_address.into() }
    }

    async fn call_uint256(&self, selector: &'static str) -> Result<u64> {
        let params = serde_json::json!([
            { "to": self.oracle_address, "data": selector },
            "latest",
        ]);
        let result: String = self.rpc.call("eth_call", params).await?;
        let digits = result.strip_prefix("0x").unwrap_or(&result);
        let tail = &digits[digits.len().saturating_sub(16)..];
        u64::from_str_radix(tail, 16).map_err(|e| Error::BadResponse { method: "eth_call", detail: e.to_string() })
    }
}

#[async_trait]
impl OutputOracle for OutputOracleRpcClient {
    async fn latest_block_number(&self) -> anyhow::Result<u64> {
        Ok(self.call_uint256(SELECTOR_LATEST_BLOCK_NUMBER).await?)
    }

    async fn next_block_number(&self) -> anyhow::Result<u64> {
        Ok(self.call_uint256(SELECTOR_NEXT_BLOCK_NUMBER).await?)
    }
}

/// Checkpoints `AGG` proofs to the current L1 head, read via a plain `eth_getBlockByNumber`.
#[derive(Debug, Clone)]
pub struct LatestL1CheckpointProvider {
    rpc: JsonRpcClient,
}

impl LatestL1CheckpointProvider {
    pub fn new(url: impl Into<String>) -> Self {
        Self { rpc: JsonRpcClient::new(url) }
    }
}

#[async_trait]
impl CheckpointProvider for LatestL1CheckpointProvider {
    async fn checkpoint(&self) -> anyhow::Result<L1Checkpoint> {
        let block: Value = self.rpc.call("eth_getBlockByNumber", ("latest", false)).await?;
        let number = block
            .get("number")
            .and_then(Value::as_str)
            .map(|s| hex_to_u64(s, "eth_getBlockByNumber"))
            .transpose()?
            .ok_or_else(|| Error::BadResponse { method: "eth_getBlockByNumber", detail: "missing number".into() })?;
        let hash = block
            .get("hash")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::BadResponse { method: "eth_getBlockByNumber", detail: "missing hash".into() })?
            .to_string();
        Ok(L1Checkpoint { number, hash })
    }
}
