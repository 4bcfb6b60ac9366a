// Error types for the image classification pipeline

use thiserror::Error;

/// Result type used across the crate
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Input or output file failure (fatal for the run)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Run summary could not be serialized
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A spot record that could not be parsed; the record is skipped
    #[error("Malformed record at line {line}: {reason}")]
    MalformedRecord { line: u64, reason: String },

    /// A report older than the open time window, refused under the reject policy
    #[error("Timestamp regression: window open at {open}, report at {got}")]
    TimeRegression { open: u64, got: u64 },

    /// Invalid engine configuration
    #[error("Configuration error: {0}")]
    Config(String),
}
