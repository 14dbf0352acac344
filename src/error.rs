use std::path::PathBuf;
use thiserror::Error;

/// The main error type for voclabel operations.
#[derive(Debug, Error)]
pub enum VocError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid argument '{field}': {message}")]
    InvalidArgument {
        field: &'static str,
        message: String,
    },

    #[error("Malformed VOC document {path}: {message}")]
    MalformedDocument { path: PathBuf, message: String },

    #[error("Failed to write JSON report: {0}")]
    JsonWrite(#[source] serde_json::Error),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}
