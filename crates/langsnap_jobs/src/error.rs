//! Error types for job handlers.

use langsnap_engine::TransferError;
use langsnap_storage::StorageError;
use thiserror::Error;

/// Result type for job operations.
pub type JobResult<T> = Result<T, JobError>;

/// Errors raised while running a job.
#[derive(Error, Debug)]
pub enum JobError {
    /// The transfer itself failed.
    #[error(transparent)]
    Transfer(#[from] TransferError),

    /// Snapshot or artifact storage failed outside a transfer.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// The job payload could not be parsed.
    #[error("invalid job payload: {0}")]
    Payload(#[from] serde_json::Error),

    /// The artifact repository failed.
    #[error("artifact repository error: {0}")]
    Repository(String),

    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl JobError {
    /// Returns true if redelivering the job may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            JobError::Transfer(e) => e.is_retryable(),
            JobError::Storage(e) => e.is_transient(),
            JobError::Payload(_) => false,
            JobError::Repository(_) => true,
            JobError::Config(_) => false,
        }
    }
}
