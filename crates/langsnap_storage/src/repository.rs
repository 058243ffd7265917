//! Snapshot storage trait definition.

use crate::error::StorageResult;
use sha2::{Digest, Sha256};
use std::io::{self, Read, Write};

/// Where an uploaded object ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locator {
    /// URI of the stored object (`memory://...`, `file://...`).
    pub uri: String,
    /// Number of bytes stored.
    pub size: u64,
    /// Lowercase hex SHA-256 of the stored bytes.
    pub sha256: String,
}

/// An object store holding snapshot payloads.
///
/// Stores are **opaque byte stores** keyed by `/`-separated strings (see
/// [`crate::SnapshotKey`] for the snapshot layout).
///
/// # Invariants
///
/// - `upload` replaces any existing object under the key, so re-running an
///   export overwrites the same keys
/// - A failed `upload` never leaves a partially written object visible
/// - `fetch` returns `Ok(None)` when the object is absent; an absent object is
///   a legitimate state, not a fault
/// - `delete` succeeds for absent objects
///
/// # Implementors
///
/// - [`super::InMemoryObjectStore`] - For testing
/// - [`super::FileObjectStore`] - For a bucket on the local filesystem
pub trait SnapshotStorage: Send + Sync {
    /// Uploads everything `body` yields under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is invalid, the store is unreachable, or
    /// reading `body` fails. Errors raised by `body` are returned as
    /// [`crate::StorageError::Io`] with the original error preserved inside.
    fn upload(&self, key: &str, body: &mut dyn Read) -> StorageResult<Locator>;

    /// Fetches the object stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error only for I/O or connectivity failures.
    fn fetch(&self, key: &str) -> StorageResult<Option<Vec<u8>>>;

    /// Deletes the object stored under `key`, returning whether one existed.
    ///
    /// # Errors
    ///
    /// Returns an error only for I/O or connectivity failures.
    fn delete(&self, key: &str) -> StorageResult<bool>;
}

/// Copies `reader` into `writer`, returning the byte count and SHA-256.
pub(crate) fn copy_hashed(reader: &mut dyn Read, writer: &mut dyn Write) -> io::Result<(u64, String)> {
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];
    let mut total = 0u64;

    loop {
        let n = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buffer[..n]);
        writer.write_all(&buffer[..n])?;
        total += n as u64;
    }

    let digest = hasher.finalize();
    let hex = digest.iter().map(|b| format!("{b:02x}")).collect();
    Ok((total, hex))
}
