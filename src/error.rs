//! Error types for acquisition and ingestion

use std::time::Duration;
use thiserror::Error;

/// One failed strategy attempt. Recovered by moving to the next strategy.
#[derive(Error, Debug)]
pub enum AccessError {
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("HTTP status {0}")]
    Status(u16),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("undecodable body: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for AccessError {
    fn from(e: reqwest::Error) -> Self {
        match e.status() {
            Some(status) => AccessError::Status(status.as_u16()),
            None if e.is_decode() => AccessError::Decode(e.to_string()),
            None => AccessError::Transport(e.to_string()),
        }
    }
}

impl From<serde_json::Error> for AccessError {
    fn from(e: serde_json::Error) -> Self {
        AccessError::Decode(e.to_string())
    }
}

/// A strategy that failed, for diagnostics
#[derive(Debug)]
pub struct AttemptFailure {
    pub strategy: String,
    pub error: AccessError,
}

/// Fatal outcome of an ingestion run
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("could not reach the data source ({} strategies failed)", .0.len())]
    TotalAcquisitionFailure(Vec<AttemptFailure>),
    #[error("no product list found in response")]
    EmptyCatalog,
    #[error("no valid colors found")]
    NoValidEntries,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
