//! Transfer job handlers.

use crate::config::JobConfig;
use crate::error::JobResult;
use crate::payload::{ExportJob, ImportJob, JobReport};
use langsnap_engine::domains::catalogue;
use langsnap_engine::store::RelationalStore;
use langsnap_engine::{Orchestrator, PluginRegistry, SnapshotTarget, TransferConfig};
use langsnap_storage::SnapshotStorage;
use std::sync::Arc;
use tracing::{info, warn};

/// Builds the registries a job runs.
pub type CatalogueFn = fn() -> Vec<PluginRegistry>;

/// Entry points invoked by the job queue.
///
/// Every invocation builds a fresh orchestrator and transfer configuration,
/// so concurrent jobs for different languages share nothing but the store
/// handles. Handlers are safe to re-run for the same payload: exports
/// overwrite the same keys and imports re-clear the same scope.
pub struct TransferJobs<S: RelationalStore, B: SnapshotStorage> {
    store: Arc<S>,
    storage: Arc<B>,
    config: JobConfig,
    catalogue: CatalogueFn,
}

impl<S: RelationalStore, B: SnapshotStorage> TransferJobs<S, B> {
    /// Creates handlers over the platform catalogue.
    pub fn new(store: Arc<S>, storage: Arc<B>, config: JobConfig) -> Self {
        Self {
            store,
            storage,
            config,
            catalogue,
        }
    }

    /// Replaces the registries jobs run.
    pub fn with_catalogue(mut self, catalogue: CatalogueFn) -> Self {
        self.catalogue = catalogue;
        self
    }

    /// Exports a language.
    pub fn export(&self, job: &ExportJob) -> JobReport {
        info!(language = %job.language_id, snapshot = %job.snapshot_id, "export job started");
        let result = self.orchestrator().export(&(self.catalogue)(), &job.target());
        let report = JobReport::from(&result);
        log_outcome("export", &report);
        report
    }

    /// Restores or imports a snapshot.
    ///
    /// The snapshot's language must carry `job.language_code`. With
    /// `discard_snapshot` the snapshot is deleted after a successful run; a
    /// failed discard is logged and does not fail the job.
    pub fn import(&self, job: &ImportJob) -> JobReport {
        info!(
            language = %job.language_id,
            snapshot = %job.snapshot_id,
            mode = %job.mode,
            "import job started"
        );
        let registries = (self.catalogue)();
        let mut config = TransferConfig::new(job.mode).with_scope_code(&job.language_code);
        let result = self.orchestrator().import(&registries, &job.target(), &mut config);
        let report = JobReport::from(&result);

        if report.is_success() && job.discard_snapshot {
            if let Err(e) = discard_snapshot(self.storage.as_ref(), &registries, &job.target()) {
                warn!(snapshot = %job.target(), error = %e, "failed to discard snapshot");
            }
        }
        log_outcome("import", &report);
        report
    }

    /// Deletes every payload of a snapshot, returning how many keys were
    /// removed.
    ///
    /// # Errors
    ///
    /// Returns an error if a key is invalid or a delete fails.
    pub fn discard(&self, target: &SnapshotTarget) -> JobResult<usize> {
        discard_snapshot(self.storage.as_ref(), &(self.catalogue)(), target)
    }

    fn orchestrator(&self) -> Orchestrator<S, B> {
        Orchestrator::new(
            self.config.engine_config(),
            Arc::clone(&self.store),
            Arc::clone(&self.storage),
        )
    }
}

fn discard_snapshot<B: SnapshotStorage + ?Sized>(
    storage: &B,
    registries: &[PluginRegistry],
    target: &SnapshotTarget,
) -> JobResult<usize> {
    let mut removed = 0;
    for name in registries.iter().flat_map(|r| r.names()) {
        let key = target.key(name)?;
        if storage.delete(key.as_str())? {
            removed += 1;
        }
    }
    info!(snapshot = %target, removed, "discarded snapshot");
    Ok(removed)
}

fn log_outcome(kind: &str, report: &JobReport) {
    match report {
        JobReport::Succeeded {
            resources_processed,
            records_transferred,
        } => info!(kind, resources_processed, records_transferred, "job succeeded"),
        JobReport::Failed {
            resource,
            cause,
            retryable,
            ..
        } => warn!(kind, resource = ?resource, cause = %cause, retryable, "job failed"),
    }
}
