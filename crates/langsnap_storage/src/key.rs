//! Object key layout.

use crate::error::{StorageError, StorageResult};
use std::fmt;

/// The key of one resource payload inside a snapshot.
///
/// Keys have the form `{languageId}/{snapshotId}/{resourceName}`. The sibling
/// `{languageId}/{snapshotId}/interlinear/...` namespace belongs to other
/// pipelines sharing the bucket, so `interlinear` is rejected as a resource
/// name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SnapshotKey {
    key: String,
    prefix_len: usize,
}

/// Reserved resource name used by the interlinear export pipeline.
const RESERVED_RESOURCE: &str = "interlinear";

impl SnapshotKey {
    /// Builds the key for `resource` in snapshot `snapshot_id` of `language_id`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidKey`] if any segment is empty, contains
    /// a `/`, is `.` or `..`, or if `resource` is reserved.
    pub fn new(language_id: &str, snapshot_id: &str, resource: &str) -> StorageResult<Self> {
        let prefix = Self::prefix(language_id, snapshot_id)?;
        validate_segment(resource, &prefix)?;
        if resource == RESERVED_RESOURCE {
            return Err(StorageError::InvalidKey {
                key: format!("{prefix}{resource}"),
                reason: "reserved resource name",
            });
        }

        Ok(Self {
            prefix_len: prefix.len(),
            key: format!("{prefix}{resource}"),
        })
    }

    /// Returns the `{languageId}/{snapshotId}/` prefix shared by a snapshot's
    /// objects.
    ///
    /// # Errors
    ///
    /// Returns an error if either segment is invalid.
    pub fn prefix(language_id: &str, snapshot_id: &str) -> StorageResult<String> {
        validate_segment(language_id, language_id)?;
        validate_segment(snapshot_id, snapshot_id)?;
        Ok(format!("{language_id}/{snapshot_id}/"))
    }

    /// Returns the full key.
    pub fn as_str(&self) -> &str {
        &self.key
    }

    /// Returns the resource name segment.
    pub fn resource(&self) -> &str {
        &self.key[self.prefix_len..]
    }
}

impl fmt::Display for SnapshotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}

fn validate_segment(segment: &str, context: &str) -> StorageResult<()> {
    let reason = if segment.is_empty() {
        "empty segment"
    } else if segment.contains('/') || segment.contains('\\') {
        "segment contains a path separator"
    } else if segment == "." || segment == ".." {
        "relative path segment"
    } else {
        return Ok(());
    };
    Err(StorageError::InvalidKey {
        key: context.to_string(),
        reason,
    })
}

/// Validates a full object key (one or more `/`-separated segments).
pub(crate) fn validate_key(key: &str) -> StorageResult<()> {
    if key.is_empty() {
        return Err(StorageError::InvalidKey {
            key: key.to_string(),
            reason: "empty key",
        });
    }
    for segment in key.split('/') {
        validate_segment(segment, key)?;
    }
    Ok(())
}
