//! Queue payloads and job results.

use crate::error::JobResult;
use langsnap_engine::{RunReport, SnapshotTarget, TransferError, TransferMode, TransferResult};
use serde::{Deserialize, Serialize};

/// Export one language into a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportJob {
    /// Language to export.
    pub language_id: String,
    /// Snapshot to write.
    pub snapshot_id: String,
}

impl ExportJob {
    /// Parses a queue message.
    ///
    /// # Errors
    ///
    /// Returns [`crate::JobError::Payload`] if the message is malformed.
    pub fn from_json(bytes: &[u8]) -> JobResult<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Returns the snapshot this job writes.
    pub fn target(&self) -> SnapshotTarget {
        SnapshotTarget::new(&self.language_id, &self.snapshot_id)
    }
}

/// Restore or import a snapshot.
///
/// ```rust
/// use langsnap_engine::TransferMode;
/// use langsnap_jobs::ImportJob;
///
/// let job = ImportJob::from_json(
///     br#"{"languageId":"l-1","languageCode":"eng","snapshotId":"s-1","mode":"import"}"#,
/// )
/// .unwrap();
/// assert_eq!(job.mode, TransferMode::Import);
/// assert!(!job.discard_snapshot);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportJob {
    /// Source language the snapshot was exported from.
    pub language_id: String,
    /// Code the snapshot's language must carry.
    pub language_code: String,
    /// Snapshot to read.
    pub snapshot_id: String,
    /// Restore keeps identifiers; import remaps them.
    pub mode: TransferMode,
    /// Delete the snapshot once the import succeeds.
    #[serde(default)]
    pub discard_snapshot: bool,
}

impl ImportJob {
    /// Parses a queue message.
    ///
    /// # Errors
    ///
    /// Returns [`crate::JobError::Payload`] if the message is malformed.
    pub fn from_json(bytes: &[u8]) -> JobResult<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Returns the snapshot this job reads.
    pub fn target(&self) -> SnapshotTarget {
        SnapshotTarget::new(&self.language_id, &self.snapshot_id)
    }
}

/// What a job hands back to the job-status collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum JobReport {
    /// Every resource finished.
    #[serde(rename_all = "camelCase")]
    Succeeded {
        /// Resources transferred.
        resources_processed: usize,
        /// Records transferred.
        records_transferred: u64,
    },
    /// The run stopped.
    #[serde(rename_all = "camelCase")]
    Failed {
        /// Resource that failed, if the run got that far.
        resource: Option<String>,
        /// Rendered root cause.
        cause: String,
        /// Resources completed before the failure.
        completed: Vec<String>,
        /// Whether redelivering the job may succeed.
        retryable: bool,
    },
}

impl JobReport {
    /// Summarizes a finished run.
    pub fn succeeded(report: &RunReport) -> Self {
        JobReport::Succeeded {
            resources_processed: report.resources_processed(),
            records_transferred: report.records_transferred(),
        }
    }

    /// Summarizes a failed run.
    pub fn failed(err: &TransferError) -> Self {
        let (resource, completed) = match err {
            TransferError::PartialRun { resource, completed, .. } => (Some(resource.clone()), completed.clone()),
            _ => (None, Vec::new()),
        };
        JobReport::Failed {
            resource,
            cause: err.root_cause().to_string(),
            completed,
            retryable: err.is_retryable(),
        }
    }

    /// Returns true for a successful job.
    pub fn is_success(&self) -> bool {
        matches!(self, JobReport::Succeeded { .. })
    }
}

impl From<&TransferResult<RunReport>> for JobReport {
    fn from(result: &TransferResult<RunReport>) -> Self {
        match result {
            Ok(report) => JobReport::succeeded(report),
            Err(err) => JobReport::failed(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_import_payload() {
        let job = ImportJob::from_json(
            br#"{"languageId":"l-1","languageCode":"eng","snapshotId":"s-1","mode":"restore","discardSnapshot":true}"#,
        )
        .unwrap();
        assert_eq!(job.mode, TransferMode::Restore);
        assert!(job.discard_snapshot);
        assert_eq!(job.target().to_string(), "l-1/s-1");

        assert!(ImportJob::from_json(br#"{"languageId":"l-1","mode":"merge"}"#).is_err());
    }

    #[test]
    fn failure_report_shape() {
        let err = TransferError::PartialRun {
            resource: "gloss".into(),
            completed: vec!["language".into(), "phrase".into()],
            source: Box::new(TransferError::TransientIo("connection reset".into())),
        };
        assert_eq!(
            serde_json::to_value(JobReport::failed(&err)).unwrap(),
            json!({
                "status": "failed",
                "resource": "gloss",
                "cause": "transient I/O failure: connection reset",
                "completed": ["language", "phrase"],
                "retryable": true,
            })
        );
    }

    #[test]
    fn success_report_shape() {
        let report = JobReport::Succeeded {
            resources_processed: 10,
            records_transferred: 42,
        };
        assert_eq!(
            serde_json::to_value(report).unwrap(),
            json!({"status": "succeeded", "resourcesProcessed": 10, "recordsTransferred": 42})
        );
    }
}
