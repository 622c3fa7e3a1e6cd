//! Error types for configuration loading.

use thiserror::Error;

/// Errors that can occur while loading or parsing configuration.
#[derive(Debug, Error)]
pub enum Error {
    /// Failed to read a config file from disk.
    #[error("failed to read config file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// TOML parsing error for the application config.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// JSON parsing error for a per-chain rollup config.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// A 32-byte hex field decoded to the wrong length after padding.
    #[error("field '{field}' decoded to {len} bytes, expected 32")]
    BadBytes32Length { field: &'static str, len: usize },

    /// A numeric field was neither valid hex nor valid decimal.
    #[error("field '{field}' is not valid hex or decimal: '{value}'")]
    BadNumericField { field: &'static str, value: String },
}

pub type Result<T> = std::result::Result<T, Error>;
