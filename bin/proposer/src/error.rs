//! Errors surfaced by the binary's own JSON-RPC plumbing: the L1/L2/beacon clients and
//! the output-oracle/checkpoint contract calls that implement the library crates'
//! capability traits. Modeled on `execution-witness-sentry::Error`'s `Rpc { code,
//! message }` variant.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("unexpected response shape calling {method}: {detail}")]
    BadResponse { method: &'static str, detail: String },

    #[error("parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
