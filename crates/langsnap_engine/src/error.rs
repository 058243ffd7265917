//! Error types for the transfer engine.

use crate::store::StoreError;
use langsnap_codec::CodecError;
use langsnap_storage::StorageError;
use thiserror::Error;

/// Result type for transfer operations.
pub type TransferResult<T> = Result<T, TransferError>;

/// Errors that can occur while exporting or importing a snapshot.
#[derive(Error, Debug)]
pub enum TransferError {
    /// Database or object-store connectivity failure; the whole resource may
    /// be retried.
    #[error("transient I/O failure: {0}")]
    TransientIo(String),

    /// An Import-mode foreign key has no destination mapping and no authority
    /// to create one.
    #[error("dangling reference to {resource} {source_id}")]
    DanglingReference {
        /// Resource the key points at.
        resource: String,
        /// Source-environment identifier.
        source_id: String,
    },

    /// A field value cannot be expressed in the bulk-load protocol.
    #[error("encoding error: {0}")]
    Encoding(CodecError),

    /// A stored payload could not be decoded.
    #[error("corrupt payload for {resource}: {message}")]
    CorruptPayload {
        /// Resource whose payload is damaged.
        resource: String,
        /// What went wrong.
        message: String,
    },

    /// A run stopped part-way through its registry.
    #[error("transfer failed at {resource} after completing {completed:?}: {source}")]
    PartialRun {
        /// Resource that failed.
        resource: String,
        /// Resources completed before the failure, in run order.
        completed: Vec<String>,
        /// The failure itself.
        #[source]
        source: Box<TransferError>,
    },

    /// The plugin lacks the requested capability.
    #[error("{resource} does not support {operation}")]
    Unsupported {
        /// Resource name.
        resource: String,
        /// Missing operation.
        operation: &'static str,
    },

    /// Non-transient relational store failure.
    #[error("store error: {0}")]
    Store(StoreError),

    /// Non-transient object storage failure.
    #[error("storage error: {0}")]
    Storage(StorageError),

    /// The scope row the transfer is anchored on does not exist.
    #[error("{resource} {scope} not found")]
    ScopeNotFound {
        /// Scope resource name.
        resource: String,
        /// Scope identifier.
        scope: String,
    },

    /// The snapshot belongs to a different language than requested.
    #[error("snapshot holds language {found}, expected {expected}")]
    ScopeMismatch {
        /// Requested business key.
        expected: String,
        /// Business key found in the snapshot.
        found: String,
    },

    /// A mapping was bound twice to different destinations.
    #[error("{resource} {source_id} already maps to {existing}, cannot map to {requested}")]
    MappingConflict {
        /// Resource name.
        resource: String,
        /// Source identifier.
        source_id: String,
        /// Destination already recorded.
        existing: String,
        /// Destination requested.
        requested: String,
    },

    /// The registries or transfer configuration are inconsistent.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The run was cancelled between resources.
    #[error("transfer cancelled")]
    Cancelled,

    /// The orchestrator is already driving a run.
    #[error("a transfer is already running")]
    AlreadyRunning,
}

impl TransferError {
    /// Creates an unsupported-capability error.
    pub fn unsupported(resource: impl Into<String>, operation: &'static str) -> Self {
        Self::Unsupported {
            resource: resource.into(),
            operation,
        }
    }

    /// Creates a corrupt-payload error from a decoding failure.
    pub fn corrupt(resource: impl Into<String>, message: impl ToString) -> Self {
        Self::CorruptPayload {
            resource: resource.into(),
            message: message.to_string(),
        }
    }

    /// Returns true if retrying the failed resource may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            TransferError::TransientIo(_) => true,
            TransferError::PartialRun { source, .. } => source.is_retryable(),
            _ => false,
        }
    }

    /// Returns the root cause, looking through [`TransferError::PartialRun`].
    pub fn root_cause(&self) -> &TransferError {
        match self {
            TransferError::PartialRun { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

impl From<StoreError> for TransferError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Codec(codec) if codec.is_encoding() => TransferError::Encoding(codec),
            err if err.is_transient() => TransferError::TransientIo(err.to_string()),
            err => TransferError::Store(err),
        }
    }
}

impl From<StorageError> for TransferError {
    fn from(err: StorageError) -> Self {
        if err.is_transient() {
            TransferError::TransientIo(err.to_string())
        } else {
            TransferError::Storage(err)
        }
    }
}
