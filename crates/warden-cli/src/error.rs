//! Error types for the CLI application.

use thiserror::Error;
use warden_domain::{ErrorKind, StoreFailure};
use warden_janitor::JanitorError;
use warden_store::StoreError;

/// Result type alias for CLI operations.
pub type Result<T> = std::result::Result<T, CliError>;

/// Exit code for a clean run.
pub const EXIT_SUCCESS: u8 = 0;
/// Exit code for invalid flags, configuration or DSN.
pub const EXIT_CONFIG: u8 = 1;
/// Exit code for a database failure.
pub const EXIT_STORAGE: u8 = 2;
/// Exit code for an interrupted run.
pub const EXIT_CANCELLED: u8 = 130;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// Janitor error
    #[error(transparent)]
    Janitor(#[from] JanitorError),

    /// Store error
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    /// Background task failed
    #[error("Janitor task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl CliError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            CliError::Janitor(e) if e.is_config() => EXIT_CONFIG,
            CliError::Janitor(e) => e.kind().map(kind_exit_code).unwrap_or(EXIT_CONFIG),
            CliError::Store(StoreError::InvalidDsn(_)) => EXIT_CONFIG,
            CliError::Store(e) => kind_exit_code(e.kind()),
            CliError::Task(_) => EXIT_STORAGE,
        }
    }
}

/// Exit code for a store error category.
///
/// NotFound never fails a run.
pub fn kind_exit_code(kind: ErrorKind) -> u8 {
    match kind {
        ErrorKind::NotFound => EXIT_SUCCESS,
        ErrorKind::Storage => EXIT_STORAGE,
        ErrorKind::Cancelled => EXIT_CANCELLED,
    }
}
