//! Discard command implementation.

use super::{print_json, CliError, Environment};
use langsnap_engine::SnapshotTarget;
use serde::Serialize;

/// Discard result.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscardResult {
    /// Snapshot prefix.
    pub snapshot: String,
    /// Payloads deleted.
    pub removed: usize,
}

/// Runs the discard command.
pub fn run(env: &Environment, language_id: &str, snapshot_id: &str) -> Result<(), CliError> {
    let (_, jobs) = env.jobs()?;
    let target = SnapshotTarget::new(language_id, snapshot_id);
    let removed = jobs.discard(&target)?;
    print_json(&DiscardResult {
        snapshot: target.to_string(),
        removed,
    });
    Ok(())
}
