//! Directory client error types.

use thiserror::Error;

/// Result type for directory operations.
pub type DirectoryResult<T> = Result<T, DirectoryError>;

/// Errors from the membership directory client.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// Network-level failure talking to the directory service.
    #[error("directory request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The directory service answered with a non-success status.
    #[error("directory service returned HTTP {status}: {detail}")]
    Status { status: u16, detail: String },

    /// A payload did not match the expected record shape.
    #[error("failed to parse directory payload: {0}")]
    Parse(String),

    /// Reading or writing a dump file failed.
    #[error("dump file error: {0}")]
    Io(#[from] std::io::Error),

    /// A dump file held malformed JSON.
    #[error("dump file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The replay file lacks a payload that was requested.
    #[error("replay file is missing the '{0}' payload")]
    ReplayMissing(&'static str),
}
