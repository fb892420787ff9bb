//! Error types shared by the index, the server, and the client.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The index file cannot hold the configured bucket table.
    #[error("index file is {actual} bytes, bucket table needs {expected}")]
    TableTooShort { expected: u64, actual: u64 },

    #[error("{} exists and is not a named pipe", .0.display())]
    NotAFifo(PathBuf),

    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, SearchError>;
