//! Retention of export artifacts.
//!
//! Export artifacts (downloadable files, not snapshots) point at a storage
//! object through `exportKey` and `downloadUrl`. Once an artifact expires the
//! cleanup job deletes the object and nulls both pointers.

use crate::config::RetentionConfig;
use crate::error::{JobError, JobResult};
use chrono::{DateTime, Duration, Utc};
use langsnap_storage::SnapshotStorage;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// An export artifact record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportArtifact {
    /// Artifact identifier.
    pub id: String,
    /// When the export was requested.
    pub requested_at: DateTime<Utc>,
    /// Explicit expiry, if any.
    pub expires_at: Option<DateTime<Utc>>,
    /// Storage key of the exported object.
    pub export_key: Option<String>,
    /// Public link to the object.
    pub download_url: Option<String>,
}

impl ExportArtifact {
    /// Returns true once the artifact's object may be deleted.
    ///
    /// An explicit `expires_at` wins; otherwise the artifact lives for
    /// `fallback` after the request.
    pub fn is_expired(&self, now: DateTime<Utc>, fallback: Duration) -> bool {
        match self.expires_at {
            Some(expires_at) => expires_at <= now,
            // A window past the representable range never ends.
            None => self
                .requested_at
                .checked_add_signed(fallback)
                .is_some_and(|expiry| expiry <= now),
        }
    }
}

/// Where artifact records live.
pub trait ArtifactRepository: Send + Sync {
    /// Returns the artifacts that still point at a storage object.
    ///
    /// # Errors
    ///
    /// Returns [`JobError::Repository`] if the records cannot be read.
    fn with_objects(&self) -> JobResult<Vec<ExportArtifact>>;

    /// Nulls an artifact's `export_key` and `download_url`.
    ///
    /// # Errors
    ///
    /// Returns [`JobError::Repository`] if the record cannot be updated.
    fn clear_pointers(&self, id: &str) -> JobResult<()>;
}

/// In-memory artifact records.
#[derive(Debug)]
pub struct InMemoryArtifactRepository {
    artifacts: RwLock<BTreeMap<String, ExportArtifact>>,
    available: AtomicBool,
}

impl InMemoryArtifactRepository {
    /// Creates an empty repository.
    pub fn new() -> Self {
        Self {
            artifacts: RwLock::new(BTreeMap::new()),
            available: AtomicBool::new(true),
        }
    }

    /// Adds or replaces an artifact.
    pub fn insert(&self, artifact: ExportArtifact) {
        self.artifacts.write().insert(artifact.id.clone(), artifact);
    }

    /// Returns an artifact by id.
    pub fn get(&self, id: &str) -> Option<ExportArtifact> {
        self.artifacts.read().get(id).cloned()
    }

    /// Sets whether the repository answers requests.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn check_available(&self) -> JobResult<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(JobError::Repository("artifact repository unavailable".into()))
        }
    }
}

impl Default for InMemoryArtifactRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl ArtifactRepository for InMemoryArtifactRepository {
    fn with_objects(&self) -> JobResult<Vec<ExportArtifact>> {
        self.check_available()?;
        Ok(self
            .artifacts
            .read()
            .values()
            .filter(|a| a.export_key.is_some())
            .cloned()
            .collect())
    }

    fn clear_pointers(&self, id: &str) -> JobResult<()> {
        self.check_available()?;
        let mut artifacts = self.artifacts.write();
        let artifact = artifacts
            .get_mut(id)
            .ok_or_else(|| JobError::Repository(format!("unknown artifact {id}")))?;
        artifact.export_key = None;
        artifact.download_url = None;
        Ok(())
    }
}

/// What a cleanup pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupReport {
    /// Artifacts that still pointed at an object.
    pub examined: usize,
    /// Artifacts whose object was deleted and pointers cleared.
    pub deleted: Vec<String>,
    /// Artifacts that could not be cleaned; retried on the next pass.
    pub failed: Vec<String>,
}

/// The scheduled job deleting expired export artifacts.
pub struct ExportCleanupJob<R: ArtifactRepository, B: SnapshotStorage> {
    repository: Arc<R>,
    storage: Arc<B>,
    retention: RetentionConfig,
}

impl<R: ArtifactRepository, B: SnapshotStorage> ExportCleanupJob<R, B> {
    /// Creates the job.
    pub fn new(repository: Arc<R>, storage: Arc<B>, retention: RetentionConfig) -> Self {
        Self {
            repository,
            storage,
            retention,
        }
    }

    /// Runs one pass as of `now`.
    ///
    /// A failure on one artifact is logged and the pass moves on; that
    /// artifact keeps its pointers so the next pass tries again.
    ///
    /// # Errors
    ///
    /// Returns an error only if the artifact list cannot be read.
    pub fn run(&self, now: DateTime<Utc>) -> JobResult<CleanupReport> {
        let fallback = self.retention.fallback();
        let artifacts = self.repository.with_objects()?;
        let mut report = CleanupReport {
            examined: artifacts.len(),
            ..CleanupReport::default()
        };

        for artifact in artifacts.into_iter().filter(|a| a.is_expired(now, fallback)) {
            match self.clean(&artifact) {
                Ok(()) => {
                    debug!(artifact = %artifact.id, "deleted expired export");
                    report.deleted.push(artifact.id);
                }
                Err(e) => {
                    warn!(artifact = %artifact.id, error = %e, "failed to delete expired export");
                    report.failed.push(artifact.id);
                }
            }
        }

        info!(
            examined = report.examined,
            deleted = report.deleted.len(),
            failed = report.failed.len(),
            "export cleanup finished"
        );
        Ok(report)
    }

    fn clean(&self, artifact: &ExportArtifact) -> JobResult<()> {
        if let Some(key) = &artifact.export_key {
            self.storage.delete(key)?;
        }
        self.repository.clear_pointers(&artifact.id)
    }
}
