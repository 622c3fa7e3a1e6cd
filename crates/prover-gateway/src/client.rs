use std::time::Duration;

use reqwest::Client as HttpClient;

use crate::error::{Error, Result};
use crate::types::{
    ProofStatus, RequestAggProofRequest, RequestProofResponse, RequestSpanProofRequest, StatusResponse,
};

/// Proof-request RPCs time out at 3 minutes (§4.3, §5).
const REQUEST_TIMEOUT: Duration = Duration::from_secs(180);
/// Status polls time out at 30 seconds (§4.3, §5).
const POLL_TIMEOUT: Duration = Duration::from_secs(30);

/// Thin HTTP client for the external prover service (C3).
///
/// One method per operation in §4.3/§6, each building a request, awaiting it under
/// [`tokio::time::timeout`], and mapping a non-2xx response to [`Error::ErrorStatus`]
/// carrying the response body — the same shape as the teacher's `zkBoostClient`,
/// generalized from its fixed `execute`/`prove`/`verify` routes to the span/agg/status
/// routes this gateway requires.
#[derive(Clone, Debug)]
pub struct ProverGateway {
    base_url: String,
    http: HttpClient,
}

impl ProverGateway {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            http: HttpClient::new(),
        }
    }

    pub fn with_http_client(base_url: impl Into<String>, http: HttpClient) -> Self {
        Self { base_url: base_url.into(), http }
    }

    /// `request_span_proof(start, end) -> prover_request_id` (§4.3).
    pub async fn request_span_proof(&self, start: u64, end: u64) -> Result<String> {
        let url = format!("{}/request_span_proof", self.base_url);
        let body = RequestSpanProofRequest { start, end };
        let resp: RequestProofResponse = self.post(&url, &body, REQUEST_TIMEOUT).await?;
        Ok(resp.proof_id)
    }

    /// `request_agg_proof(subproofs, l1_head) -> prover_request_id` (§4.3).
    pub async fn request_agg_proof(&self, subproofs: Vec<Vec<u8>>, l1_head: String) -> Result<String> {
        let url = format!("{}/request_agg_proof", self.base_url);
        let body = RequestAggProofRequest { subproofs, head: l1_head };
        let resp: RequestProofResponse = self.post(&url, &body, REQUEST_TIMEOUT).await?;
        Ok(resp.proof_id)
    }

    /// `get_status(prover_request_id) -> (status, proof_bytes)` (§4.3).
    pub async fn get_status(&self, prover_request_id: &str) -> Result<(ProofStatus, Vec<u8>)> {
        let url = format!("{}/status/{}", self.base_url, prover_request_id);
        let resp: StatusResponse = self.get(&url, POLL_TIMEOUT).await?;
        let status = ProofStatus::from(resp.status.as_str());
        Ok((status, resp.proof))
    }

    async fn post<B: serde::Serialize, R: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        body: &B,
        timeout: Duration,
    ) -> Result<R> {
        let fut = self.http.post(url).json(body).send();
        let response = tokio::time::timeout(timeout, fut)
            .await
            .map_err(|_| Error::Timeout(timeout))??;
        Self::decode(url, response).await
    }

    async fn get<R: serde::de::DeserializeOwned>(&self, url: &str, timeout: Duration) -> Result<R> {
        let fut = self.http.get(url).send();
        let response = tokio::time::timeout(timeout, fut)
            .await
            .map_err(|_| Error::Timeout(timeout))??;
        Self::decode(url, response).await
    }

    async fn decode<R: serde::de::DeserializeOwned>(url: &str, response: reqwest::Response) -> Result<R> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::ErrorStatus { url: url.to_string(), status, body });
        }
        Ok(response.json::<R>().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::Path, routing::{get, post}, Json, Router};
    use serde_json::json;

    async fn spawn_stub() -> String {
        let app = Router::new()
            .route(
                "/request_span_proof",
                post(|Json(body): Json<serde_json::Value>| async move {
                    Json(json!({ "proof_id": format!("span-{}-{}", body["start"], body["end"]) }))
                }),
            )
            .route(
                "/status/:id",
                get(|Path(id): Path<String>| async move {
                    if id == "unclaimed" {
                        Json(json!({ "status": "PROOF_UNCLAIMED", "proof": "" }))
                    } else if id == "pending" {
                        Json(json!({ "status": "IN_PROGRESS", "proof": "" }))
                    } else {
                        use base64::Engine;
                        let encoded = base64::engine::general_purpose::STANDARD.encode(b"proof-bytes");
                        Json(json!({ "status": "PROOF_FULFILLED", "proof": encoded }))
                    }
                }),
            );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn request_span_proof_returns_proof_id() {
        let base = spawn_stub().await;
        let gw = ProverGateway::new(base);
        let id = gw.request_span_proof(100, 199).await.unwrap();
        assert_eq!(id, "span-100-199");
    }

    #[tokio::test]
    async fn get_status_distinguishes_fulfilled_unclaimed_and_pending() {
        let base = spawn_stub().await;
        let gw = ProverGateway::new(base);

        let (status, proof) = gw.get_status("anything").await.unwrap();
        assert_eq!(status, ProofStatus::Fulfilled);
        assert_eq!(proof, b"proof-bytes");

        let (status, _) = gw.get_status("unclaimed").await.unwrap();
        assert_eq!(status, ProofStatus::Unclaimed);

        let (status, _) = gw.get_status("pending").await.unwrap();
        assert_eq!(status, ProofStatus::Pending);
    }
}
