//! The transfer state machine.
//!
//! An [`Orchestrator`] walks the plugins of one or more registries in order
//! and moves each resource through its phases:
//!
//! ```text
//! export: Idle -> Reading -> Encoding -> Storing -> (next resource | Done)
//! import: Idle -> Fetching -> Decoding -> Clearing -> Writing -> (next resource | Done)
//! ```
//!
//! A failure stops the walk in [`TransferState::Failed`]. Completed resources
//! are not rolled back; the error is a [`TransferError::PartialRun`] listing
//! them, and a later run may skip them via [`RunOptions::resume`].

use crate::config::{EngineConfig, TransferConfig};
use crate::error::{TransferError, TransferResult};
use crate::plugin::{RecordStream, ResourcePlugin};
use crate::registry::{validate_catalogue, PluginRegistry};
use crate::report::{Direction, ResourceReport, RunReport, SkipReason};
use crate::store::RelationalStore;
use langsnap_codec::{CodecError, Value};
use langsnap_storage::{SnapshotKey, SnapshotStorage, StorageError};
use parking_lot::RwLock;
use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// The phase the orchestrator is in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferState {
    /// No run has started.
    Idle,
    /// Querying a resource's rows.
    Reading(&'static str),
    /// Serializing a resource's rows.
    Encoding(&'static str),
    /// Uploading a resource's payload.
    Storing(&'static str),
    /// Downloading a resource's payload.
    Fetching(&'static str),
    /// Validating a resource's payload.
    Decoding(&'static str),
    /// Deleting a resource's destination rows.
    Clearing(&'static str),
    /// Loading a resource's rows.
    Writing(&'static str),
    /// The last run completed.
    Done,
    /// The last run stopped at `resource`.
    Failed {
        /// Resource that failed.
        resource: &'static str,
        /// Rendered cause.
        cause: String,
    },
}

impl TransferState {
    /// Returns true while a resource is being processed.
    pub fn is_active(&self) -> bool {
        !matches!(self, TransferState::Idle | TransferState::Done | TransferState::Failed { .. })
    }

    /// Returns the resource being processed, if any.
    pub fn resource(&self) -> Option<&'static str> {
        match self {
            TransferState::Reading(r)
            | TransferState::Encoding(r)
            | TransferState::Storing(r)
            | TransferState::Fetching(r)
            | TransferState::Decoding(r)
            | TransferState::Clearing(r)
            | TransferState::Writing(r) => Some(r),
            TransferState::Failed { resource, .. } => Some(resource),
            TransferState::Idle | TransferState::Done => None,
        }
    }
}

/// Statistics accumulated across runs.
#[derive(Debug, Clone, Default)]
pub struct TransferStats {
    /// Runs that reached `Done`.
    pub runs_completed: u64,
    /// Runs that stopped in `Failed`.
    pub runs_failed: u64,
    /// Records moved by completed resources.
    pub records_transferred: u64,
    /// Resource retries.
    pub retries: u64,
    /// Last failure, rendered.
    pub last_error: Option<String>,
}

/// The snapshot a run reads or writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotTarget {
    /// Source language identifier; also the snapshot's key prefix.
    pub language_id: String,
    /// Snapshot identifier.
    pub snapshot_id: String,
}

impl SnapshotTarget {
    /// Creates a target.
    pub fn new(language_id: impl Into<String>, snapshot_id: impl Into<String>) -> Self {
        Self {
            language_id: language_id.into(),
            snapshot_id: snapshot_id.into(),
        }
    }

    /// Returns the storage key of `resource`'s payload.
    ///
    /// # Errors
    ///
    /// Returns an error if the identifiers cannot form a key.
    pub fn key(&self, resource: &str) -> TransferResult<SnapshotKey> {
        Ok(SnapshotKey::new(&self.language_id, &self.snapshot_id, resource)?)
    }

    /// Returns the source scope value.
    pub fn scope(&self) -> Value {
        Value::Text(self.language_id.clone())
    }
}

impl fmt::Display for SnapshotTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.language_id, self.snapshot_id)
    }
}

/// Options for a single run.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    skip: HashSet<String>,
}

impl RunOptions {
    /// Options that skip the resources a failed run completed.
    ///
    /// In Import mode the scope resource is re-run anyway, since later
    /// resources need its identifier binding. Resume an Import with the same
    /// [`TransferConfig`] so earlier mappings are still known.
    pub fn resume<I, S>(completed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            skip: completed.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns true if `resource` is skipped.
    pub fn skips(&self, resource: &str) -> bool {
        self.skip.contains(resource)
    }
}

/// Cancels an orchestrator's run from another thread.
#[derive(Debug, Clone)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    /// Requests cancellation; the run stops at its next state transition.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Returns true if cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Drives export and import runs over a relational store and an object store.
///
/// One orchestrator runs one transfer at a time. Transfers of different
/// languages run concurrently on separate orchestrators sharing the same
/// store and storage handles.
pub struct Orchestrator<S: RelationalStore, B: SnapshotStorage> {
    config: EngineConfig,
    store: Arc<S>,
    storage: Arc<B>,
    state: RwLock<TransferState>,
    stats: RwLock<TransferStats>,
    cancelled: Arc<AtomicBool>,
    running: AtomicBool,
}

impl<S: RelationalStore, B: SnapshotStorage> Orchestrator<S, B> {
    /// Creates an orchestrator.
    pub fn new(config: EngineConfig, store: Arc<S>, storage: Arc<B>) -> Self {
        Self {
            config,
            store,
            storage,
            state: RwLock::new(TransferState::Idle),
            stats: RwLock::new(TransferStats::default()),
            cancelled: Arc::new(AtomicBool::new(false)),
            running: AtomicBool::new(false),
        }
    }

    /// Returns the current state.
    pub fn state(&self) -> TransferState {
        self.state.read().clone()
    }

    /// Returns accumulated statistics.
    pub fn stats(&self) -> TransferStats {
        self.stats.read().clone()
    }

    /// Returns the relational store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Returns the object store.
    pub fn storage(&self) -> &Arc<B> {
        &self.storage
    }

    /// Requests cancellation of the current run.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Clears a cancellation request.
    pub fn reset_cancel(&self) {
        self.cancelled.store(false, Ordering::SeqCst);
    }

    /// Returns a handle that cancels this orchestrator's runs.
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle(Arc::clone(&self.cancelled))
    }

    /// Exports every resource of `registries` for `target`'s language.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::PartialRun`] if a resource fails, or a
    /// configuration error if the registries are inconsistent.
    pub fn export(&self, registries: &[PluginRegistry], target: &SnapshotTarget) -> TransferResult<RunReport> {
        self.export_with(registries, target, &RunOptions::default())
    }

    /// Exports with explicit run options.
    ///
    /// # Errors
    ///
    /// See [`Orchestrator::export`].
    pub fn export_with(
        &self,
        registries: &[PluginRegistry],
        target: &SnapshotTarget,
        options: &RunOptions,
    ) -> TransferResult<RunReport> {
        validate_catalogue(registries)?;
        self.drive(Direction::Export, registries, target, options, None, |plugin| {
            self.export_resource(plugin, target)
        })
    }

    /// Imports `target` into the store, restoring or remapping per `config`.
    ///
    /// `config` carries the run's ID mappers; keep it to resume a failed run.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::PartialRun`] if a resource fails, or a
    /// configuration error if the registries are inconsistent.
    pub fn import(
        &self,
        registries: &[PluginRegistry],
        target: &SnapshotTarget,
        config: &mut TransferConfig,
    ) -> TransferResult<RunReport> {
        self.import_with(registries, target, config, &RunOptions::default())
    }

    /// Imports with explicit run options.
    ///
    /// # Errors
    ///
    /// See [`Orchestrator::import`].
    pub fn import_with(
        &self,
        registries: &[PluginRegistry],
        target: &SnapshotTarget,
        config: &mut TransferConfig,
        options: &RunOptions,
    ) -> TransferResult<RunReport> {
        let scope_resource = validate_catalogue(registries)?;
        let always_run = if config.is_import() {
            for registry in registries {
                registry.register_mappers(&mut config.mappers);
            }
            Some(scope_resource)
        } else {
            None
        };

        self.drive(Direction::Import, registries, target, options, always_run, |plugin| {
            self.import_resource(plugin, target, scope_resource, config)
        })
    }

    fn drive<F>(
        &self,
        direction: Direction,
        registries: &[PluginRegistry],
        target: &SnapshotTarget,
        options: &RunOptions,
        always_run: Option<&str>,
        mut step: F,
    ) -> TransferResult<RunReport>
    where
        F: FnMut(&dyn ResourcePlugin) -> TransferResult<ResourceReport>,
    {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(TransferError::AlreadyRunning);
        }
        // Held until the final state and stats are written, or a plugin panics.
        let _running = RunningGuard(&self.running);
        let start = Instant::now();
        let mut report = RunReport::new(direction);
        info!(%direction, %target, "starting transfer");

        let mut outcome = Ok(());
        for plugin in registries.iter().flat_map(|r| r.plugins()) {
            let name = plugin.name();
            if options.skips(name) && always_run != Some(name) {
                debug!(resource = name, "already completed, skipping");
                report.push(ResourceReport::skipped(name, SkipReason::AlreadyCompleted));
                continue;
            }
            match self.with_retry(name, || step(plugin)) {
                Ok(resource) => {
                    info!(resource = name, records = resource.records, status = ?resource.status, "resource finished");
                    report.push(resource);
                }
                Err(e) => {
                    outcome = Err((name, e));
                    break;
                }
            }
        }
        report.duration = start.elapsed();

        match outcome {
            Ok(()) => {
                self.set_state(TransferState::Done);
                let mut stats = self.stats.write();
                stats.runs_completed += 1;
                stats.records_transferred += report.records_transferred();
                stats.last_error = None;
                info!(
                    %direction,
                    %target,
                    resources = report.resources_processed(),
                    records = report.records_transferred(),
                    elapsed_ms = report.duration.as_millis() as u64,
                    "transfer complete"
                );
                Ok(report)
            }
            Err((resource, cause)) => {
                warn!(%direction, %target, resource, error = %cause, "transfer failed");
                self.set_state(TransferState::Failed {
                    resource,
                    cause: cause.to_string(),
                });
                let mut stats = self.stats.write();
                stats.runs_failed += 1;
                stats.records_transferred += report.records_transferred();
                stats.last_error = Some(cause.to_string());
                Err(TransferError::PartialRun {
                    resource: resource.to_string(),
                    completed: report.completed(),
                    source: Box::new(cause),
                })
            }
        }
    }

    /// Runs `op` until it succeeds, fails permanently or exhausts the
    /// configured attempts.
    fn with_retry<T>(&self, resource: &str, mut op: impl FnMut() -> TransferResult<T>) -> TransferResult<T> {
        let retry = &self.config.retry;
        let mut attempt = 0;
        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt + 1 < retry.max_attempts => {
                    attempt += 1;
                    let delay = retry.delay_for_attempt(attempt);
                    warn!(resource, attempt, delay_ms = delay.as_millis() as u64, error = %e, "retrying resource");
                    self.stats.write().retries += 1;
                    self.sleep(delay)?;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn sleep(&self, delay: Duration) -> TransferResult<()> {
        self.check_cancelled()?;
        std::thread::sleep(delay);
        self.check_cancelled()
    }

    fn export_resource(&self, plugin: &dyn ResourcePlugin, target: &SnapshotTarget) -> TransferResult<ResourceReport> {
        let name = plugin.name();
        if !plugin.capabilities().read {
            debug!(resource = name, "not readable, skipping");
            return Ok(ResourceReport::skipped(name, SkipReason::NotExported));
        }
        let key = target.key(name)?;

        self.transition(TransferState::Reading(name))?;
        let store: &dyn RelationalStore = self.store.as_ref();
        let records = plugin.read(store, &target.scope())?;
        let counter = Arc::new(AtomicU64::new(0));
        let counted = count_records(records, Arc::clone(&counter));

        self.transition(TransferState::Encoding(name))?;
        let mut body = plugin.encode(counted);

        self.transition(TransferState::Storing(name))?;
        let locator = self.storage.upload(key.as_str(), &mut body).map_err(upload_error)?;

        let records = counter.load(Ordering::SeqCst);
        debug!(resource = name, records, size = locator.size, uri = %locator.uri, "stored payload");
        Ok(ResourceReport::done(name, records))
    }

    fn import_resource(
        &self,
        plugin: &dyn ResourcePlugin,
        target: &SnapshotTarget,
        scope_resource: &str,
        config: &mut TransferConfig,
    ) -> TransferResult<ResourceReport> {
        let name = plugin.name();
        let capabilities = plugin.capabilities();
        if !capabilities.write {
            debug!(resource = name, "not writable, skipping");
            return Ok(ResourceReport::skipped(name, SkipReason::NotWritable));
        }
        let key = target.key(name)?;

        let store: &dyn RelationalStore = self.store.as_ref();
        self.transition(TransferState::Fetching(name))?;
        let Some(payload) = self.storage.fetch(key.as_str())? else {
            // Never exported: the destination's derived rows are stale.
            if !capabilities.read && capabilities.clear {
                self.transition(TransferState::Clearing(name))?;
                let scope = destination_scope(target, scope_resource, config)?;
                let cleared = plugin.clear(store, &scope)?;
                debug!(resource = name, cleared, %scope, "cleared derived rows");
                return Ok(ResourceReport::skipped(name, SkipReason::ClearedOnly));
            }
            info!(resource = name, %key, "no payload in snapshot, skipping");
            return Ok(ResourceReport::skipped(name, SkipReason::Absent));
        };

        // Validate the whole payload before touching the destination.
        self.transition(TransferState::Decoding(name))?;
        let decoded = plugin.decode(&payload).try_fold(0u64, |n, r| r.map(|_| n + 1))?;

        if capabilities.clear {
            self.transition(TransferState::Clearing(name))?;
            let scope = destination_scope(target, scope_resource, config)?;
            let cleared = plugin.clear(store, &scope)?;
            debug!(resource = name, cleared, %scope, "cleared destination scope");
        }

        self.transition(TransferState::Writing(name))?;
        let written = plugin.write(store, plugin.decode(&payload), config)?;
        if written != decoded {
            warn!(resource = name, decoded, written, "written count differs from payload");
        }
        Ok(ResourceReport::done(name, written))
    }

    fn transition(&self, state: TransferState) -> TransferResult<()> {
        self.check_cancelled()?;
        debug!(?state, "transition");
        self.set_state(state);
        Ok(())
    }

    fn check_cancelled(&self) -> TransferResult<()> {
        if self.cancelled.load(Ordering::SeqCst) {
            Err(TransferError::Cancelled)
        } else {
            Ok(())
        }
    }

    fn set_state(&self, state: TransferState) {
        *self.state.write() = state;
    }
}

struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Resolves the scope rows are cleared in: the source language in Restore
/// mode, its mapped destination in Import mode.
fn destination_scope(target: &SnapshotTarget, scope_resource: &str, config: &TransferConfig) -> TransferResult<Value> {
    let source = target.scope();
    if !config.is_import() {
        return Ok(source);
    }
    config
        .mappers
        .lookup(scope_resource, &source)
        .cloned()
        .ok_or_else(|| TransferError::DanglingReference {
            resource: scope_resource.to_string(),
            source_id: target.language_id.clone(),
        })
}

fn count_records(records: RecordStream<'_>, counter: Arc<AtomicU64>) -> RecordStream<'_> {
    Box::new(records.inspect(move |record| {
        if record.is_ok() {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    }))
}

/// Recovers the error that aborted a payload stream mid-upload.
fn upload_error(err: StorageError) -> TransferError {
    let StorageError::Io(io) = err else {
        return err.into();
    };
    let message = io.to_string();
    let Some(inner) = io.into_inner() else {
        return TransferError::TransientIo(message);
    };
    match inner.downcast::<TransferError>() {
        Ok(transfer) => *transfer,
        Err(inner) => match inner.downcast::<CodecError>() {
            Ok(codec) if codec.is_encoding() => TransferError::Encoding(*codec),
            Ok(codec) => TransferError::Store(crate::store::StoreError::Codec(*codec)),
            Err(other) => TransferError::TransientIo(other.to_string()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn state_helpers() {
        assert!(TransferState::Writing("gloss").is_active());
        assert!(!TransferState::Done.is_active());
        assert_eq!(TransferState::Clearing("phrase").resource(), Some("phrase"));
        assert_eq!(TransferState::Idle.resource(), None);
    }

    #[test]
    fn resume_options() {
        let options = RunOptions::resume(["language", "phrase"]);
        assert!(options.skips("phrase"));
        assert!(!options.skips("gloss"));
    }

    #[test]
    fn target_keys() {
        let target = SnapshotTarget::new("lang-1", "snap-1");
        assert_eq!(target.key("gloss").unwrap().as_str(), "lang-1/snap-1/gloss");
        assert_eq!(target.to_string(), "lang-1/snap-1");
        assert!(target.key("a/b").is_err());
    }

    #[test]
    fn upload_errors_keep_their_cause() {
        let wrapped = StorageError::Io(io::Error::other(TransferError::DanglingReference {
            resource: "user".into(),
            source_id: "u".into(),
        }));
        assert!(matches!(upload_error(wrapped), TransferError::DanglingReference { .. }));

        let encoding = StorageError::Io(io::Error::new(
            io::ErrorKind::InvalidData,
            CodecError::NulCharacter { field: 1 },
        ));
        assert!(matches!(upload_error(encoding), TransferError::Encoding(_)));

        let plain = StorageError::Io(io::Error::new(io::ErrorKind::ConnectionReset, "reset"));
        assert!(upload_error(plain).is_retryable());
    }
}
