//! Filesystem-backed object store.

use crate::error::{StorageError, StorageResult};
use crate::key::validate_key;
use crate::repository::{copy_hashed, Locator, SnapshotStorage};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// An object store rooted at a local directory.
///
/// Each key maps to a file below the root, with `/` segments becoming
/// directories. Uploads stream into a temporary file in the destination
/// directory and are renamed into place once complete, so readers never
/// observe a partial object.
///
/// # Example
///
/// ```no_run
/// use langsnap_storage::{FileObjectStore, SnapshotStorage};
/// use std::path::Path;
///
/// let store = FileObjectStore::open(Path::new("bucket")).unwrap();
/// store.upload("l/s/phrase", &mut &b"\\.\n"[..]).unwrap();
/// ```
#[derive(Debug)]
pub struct FileObjectStore {
    root: PathBuf,
}

impl FileObjectStore {
    /// Opens a bucket rooted at `root`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn open(root: &Path) -> StorageResult<Self> {
        fs::create_dir_all(root)?;
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    /// Returns the bucket root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> StorageResult<PathBuf> {
        validate_key(key)?;
        Ok(key.split('/').fold(self.root.clone(), |path, segment| path.join(segment)))
    }
}

impl SnapshotStorage for FileObjectStore {
    fn upload(&self, key: &str, body: &mut dyn Read) -> StorageResult<Locator> {
        let path = self.path_for(key)?;
        let parent = path.parent().unwrap_or(&self.root);
        fs::create_dir_all(parent)?;

        let mut staged = NamedTempFile::new_in(parent)?;
        let (size, sha256) = copy_hashed(body, staged.as_file_mut())?;
        staged.as_file().sync_all()?;
        staged.persist(&path).map_err(|e| StorageError::Io(e.error))?;

        debug!(key, size, "stored object");
        Ok(Locator {
            uri: format!("file://{}", path.display()),
            size,
            sha256,
        })
    }

    fn fetch(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        let path = self.path_for(key)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn delete(&self, key: &str) -> StorageResult<bool> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
