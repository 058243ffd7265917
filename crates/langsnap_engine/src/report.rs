//! Run outcomes.

use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Which way a run moves data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Store to snapshot.
    Export,
    /// Snapshot to store.
    Import,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Export => f.write_str("export"),
            Direction::Import => f.write_str("import"),
        }
    }
}

/// Why a resource was passed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SkipReason {
    /// The plugin cannot be read, so it is never exported.
    NotExported,
    /// The plugin cannot be written.
    NotWritable,
    /// The snapshot holds no payload for the resource.
    Absent,
    /// The resource is never exported; only its destination scope was
    /// cleared.
    ClearedOnly,
    /// A previous run already completed the resource.
    AlreadyCompleted,
}

/// How one resource ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "camelCase")]
pub enum ResourceStatus {
    /// Transferred.
    Done,
    /// Passed over.
    Skipped(SkipReason),
}

/// The outcome of one resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceReport {
    /// Resource name.
    pub resource: &'static str,
    /// Outcome.
    #[serde(flatten)]
    pub status: ResourceStatus,
    /// Records read (export) or written (import).
    pub records: u64,
}

impl ResourceReport {
    /// A transferred resource.
    pub fn done(resource: &'static str, records: u64) -> Self {
        Self {
            resource,
            status: ResourceStatus::Done,
            records,
        }
    }

    /// A skipped resource.
    pub fn skipped(resource: &'static str, reason: SkipReason) -> Self {
        Self {
            resource,
            status: ResourceStatus::Skipped(reason),
            records: 0,
        }
    }

    /// Returns true if the resource was transferred.
    pub fn is_done(&self) -> bool {
        self.status == ResourceStatus::Done
    }
}

/// The outcome of a complete run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    /// Direction of the run.
    pub direction: Direction,
    /// Per-resource outcomes, in run order.
    pub resources: Vec<ResourceReport>,
    /// Wall-clock duration.
    #[serde(skip)]
    pub duration: Duration,
}

impl RunReport {
    /// Creates an empty report.
    pub fn new(direction: Direction) -> Self {
        Self {
            direction,
            resources: Vec::new(),
            duration: Duration::ZERO,
        }
    }

    /// Appends a resource outcome.
    pub fn push(&mut self, report: ResourceReport) {
        self.resources.push(report);
    }

    /// Number of resources transferred in this run.
    pub fn resources_processed(&self) -> usize {
        self.resources.iter().filter(|r| r.is_done()).count()
    }

    /// Total records transferred in this run.
    pub fn records_transferred(&self) -> u64 {
        self.resources.iter().map(|r| r.records).sum()
    }

    /// Names of every resource this run got past, skipped ones included.
    pub fn completed(&self) -> Vec<String> {
        self.resources.iter().map(|r| r.resource.to_string()).collect()
    }

    /// Returns the outcome for `resource`.
    pub fn get(&self, resource: &str) -> Option<&ResourceReport> {
        self.resources.iter().find(|r| r.resource == resource)
    }
}
