//! CLI error types and exit codes.

use thiserror::Error;

use keysync_access::AccessError;
use keysync_directory::DirectoryError;
use keysync_engine::EngineError;

/// Exit codes:
/// - 0: success
/// - 1: general error
/// - 2: configuration error
/// - 3: network error
pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Config(_) | CliError::Engine(EngineError::NoKeyholders { .. }) => 2,
            CliError::Engine(EngineError::Directory(DirectoryError::Http(_)))
            | CliError::Engine(EngineError::Access(AccessError::Http(_))) => 3,
            _ => 1,
        }
    }

    pub fn print(&self) {
        eprintln!("Error: {self}");
    }
}
