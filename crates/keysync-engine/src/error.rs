//! Engine error types.

use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors from a reconciliation run.
///
/// Client errors are passed through untouched: a mutation that fails after
/// its decision was logged must surface, never be masked, so the operator
/// re-runs the whole reconciliation instead of trusting a diverged cache.
#[derive(Debug, Error)]
pub enum EngineError {
    /// None of the configured key-holder aliases matched a directory list.
    /// A configuration error, not a transient condition.
    #[error("no key-holders resolved: none of the aliases {aliases:?} matched a directory list with members")]
    NoKeyholders { aliases: Vec<String> },

    #[error(transparent)]
    Directory(#[from] keysync_directory::DirectoryError),

    #[error(transparent)]
    Access(#[from] keysync_access::AccessError),
}
