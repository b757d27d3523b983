//! Access-control client error types.

use thiserror::Error;

/// Result type for access-control operations.
pub type AccessResult<T> = Result<T, AccessError>;

/// Errors from the access-control service, classified by HTTP status where
/// the distinction matters to callers.
#[derive(Debug, Error)]
pub enum AccessError {
    /// Network-level failure.
    #[error("access-control request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Resource does not exist (404).
    #[error("resource not found: {0}")]
    NotFound(String),

    /// Resource conflicts with existing state (409).
    #[error("conflict: {0}")]
    Conflict(String),

    /// The service asked us to back off (429).
    #[error("rate limited by access-control service (retry after {retry_after_secs:?}s)")]
    RateLimited { retry_after_secs: Option<u64> },

    /// Authentication rejected (401/403).
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Any other non-success response.
    #[error("access-control service returned HTTP {status}: {detail}")]
    Api { status: u16, detail: String },

    /// A response body did not deserialize.
    #[error("failed to parse access-control response: {0}")]
    Parse(String),
}
