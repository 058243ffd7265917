//! CLI command implementations.

pub mod discard;
pub mod transfer;

use langsnap_engine::domains::schema;
use langsnap_engine::store::{InMemoryStore, StoreDump, StoreError};
use langsnap_jobs::{JobConfig, TransferJobs};
use langsnap_storage::{FileObjectStore, StorageError};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Errors surfaced by CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    /// The dump file could not be read or written.
    #[error("database dump {path}: {source}")]
    Dump {
        /// Dump path.
        path: PathBuf,
        /// Underlying failure.
        #[source]
        source: io::Error,
    },

    /// The dump file is not valid JSON.
    #[error("database dump {path} is malformed: {source}")]
    Malformed {
        /// Dump path.
        path: PathBuf,
        /// Parse failure.
        #[source]
        source: serde_json::Error,
    },

    /// The dump violates the schema.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The bucket could not be opened.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The job ran and failed.
    #[error("{0} failed")]
    JobFailed(&'static str),

    /// A snapshot operation failed outside a transfer.
    #[error(transparent)]
    Job(#[from] langsnap_jobs::JobError),
}

/// Where the database dump and bucket live.
pub struct Environment {
    db: PathBuf,
    bucket: PathBuf,
    config: JobConfig,
}

impl Environment {
    pub fn new(db: PathBuf, bucket: PathBuf, attempts: u32) -> Self {
        Self {
            db,
            bucket,
            config: JobConfig::default().with_max_attempts(attempts),
        }
    }

    /// Loads the dump; a missing file is an empty database.
    pub fn load_store(&self) -> Result<Arc<InMemoryStore>, CliError> {
        let store = InMemoryStore::new(schema());
        if self.db.exists() {
            let bytes = fs::read(&self.db).map_err(|source| CliError::Dump {
                path: self.db.clone(),
                source,
            })?;
            let dump: StoreDump = serde_json::from_slice(&bytes).map_err(|source| CliError::Malformed {
                path: self.db.clone(),
                source,
            })?;
            store.load(dump)?;
        }
        Ok(Arc::new(store))
    }

    /// Writes the store back to the dump file.
    pub fn save_store(&self, store: &InMemoryStore) -> Result<(), CliError> {
        write_dump(&self.db, &store.dump())
    }

    pub fn open_bucket(&self) -> Result<Arc<FileObjectStore>, CliError> {
        Ok(Arc::new(FileObjectStore::open(&self.bucket)?))
    }

    pub fn jobs(&self) -> Result<(Arc<InMemoryStore>, TransferJobs<InMemoryStore, FileObjectStore>), CliError> {
        let store = self.load_store()?;
        let jobs = TransferJobs::new(Arc::clone(&store), self.open_bucket()?, self.config.clone());
        Ok((store, jobs))
    }
}

fn write_dump(path: &Path, dump: &StoreDump) -> Result<(), CliError> {
    let bytes = serde_json::to_vec_pretty(dump).map_err(|source| CliError::Malformed {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, bytes).map_err(|source| CliError::Dump {
        path: path.to_path_buf(),
        source,
    })
}

/// Prints a serializable result as JSON on stdout.
pub fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{json}"),
        Err(e) => tracing::warn!(error = %e, "failed to render result"),
    }
}
