//! In-memory object store for testing.

use crate::error::{StorageError, StorageResult};
use crate::key::validate_key;
use crate::repository::{copy_hashed, Locator, SnapshotStorage};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::io::Read;
use std::sync::atomic::{AtomicBool, Ordering};

/// An in-memory object store.
///
/// Suitable for unit and integration tests. Connectivity failures can be
/// simulated with [`InMemoryObjectStore::set_available`].
///
/// # Example
///
/// ```rust
/// use langsnap_storage::{InMemoryObjectStore, SnapshotStorage};
///
/// let store = InMemoryObjectStore::new();
/// assert!(store.fetch("l/s/phrase").unwrap().is_none());
/// ```
#[derive(Debug)]
pub struct InMemoryObjectStore {
    objects: RwLock<BTreeMap<String, Vec<u8>>>,
    available: AtomicBool,
}

impl InMemoryObjectStore {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(BTreeMap::new()),
            available: AtomicBool::new(true),
        }
    }

    /// Sets whether the store answers requests.
    ///
    /// While unavailable every operation fails with
    /// [`StorageError::Unavailable`].
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Returns all keys starting with `prefix`, in order.
    #[must_use]
    pub fn keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        self.objects
            .read()
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect()
    }

    /// Returns the number of stored objects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    /// Returns true if no objects are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.read().is_empty()
    }

    /// Stores `bytes` under `key` directly, bypassing availability checks.
    pub fn insert(&self, key: impl Into<String>, bytes: Vec<u8>) {
        self.objects.write().insert(key.into(), bytes);
    }

    fn check_available(&self) -> StorageResult<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StorageError::Unavailable("in-memory store switched off".into()))
        }
    }
}

impl Default for InMemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotStorage for InMemoryObjectStore {
    fn upload(&self, key: &str, body: &mut dyn Read) -> StorageResult<Locator> {
        validate_key(key)?;
        self.check_available()?;

        // Stage the body so a failed read leaves the previous object intact.
        let mut staged = Vec::new();
        let (size, sha256) = copy_hashed(body, &mut staged)?;
        self.objects.write().insert(key.to_string(), staged);

        Ok(Locator {
            uri: format!("memory://{key}"),
            size,
            sha256,
        })
    }

    fn fetch(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        validate_key(key)?;
        self.check_available()?;
        Ok(self.objects.read().get(key).cloned())
    }

    fn delete(&self, key: &str) -> StorageResult<bool> {
        validate_key(key)?;
        self.check_available()?;
        Ok(self.objects.write().remove(key).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    struct FailingReader;

    impl Read for FailingReader {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "upstream gone"))
        }
    }

    #[test]
    fn memory_upload_then_fetch() {
        let store = InMemoryObjectStore::new();
        let locator = store.upload("l/s/phrase", &mut &b"payload"[..]).unwrap();

        assert_eq!(locator.uri, "memory://l/s/phrase");
        assert_eq!(locator.size, 7);
        assert_eq!(store.fetch("l/s/phrase").unwrap(), Some(b"payload".to_vec()));
    }

    #[test]
    fn memory_upload_overwrites() {
        let store = InMemoryObjectStore::new();
        store.upload("l/s/gloss", &mut &b"old"[..]).unwrap();
        store.upload("l/s/gloss", &mut &b"new"[..]).unwrap();
        assert_eq!(store.fetch("l/s/gloss").unwrap(), Some(b"new".to_vec()));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn memory_fetch_absent_is_none() {
        let store = InMemoryObjectStore::new();
        assert_eq!(store.fetch("l/s/machine_gloss").unwrap(), None);
    }

    #[test]
    fn memory_failed_upload_keeps_previous_object() {
        let store = InMemoryObjectStore::new();
        store.upload("l/s/phrase", &mut &b"good"[..]).unwrap();

        let result = store.upload("l/s/phrase", &mut FailingReader);
        assert!(matches!(result, Err(StorageError::Io(_))));
        assert_eq!(store.fetch("l/s/phrase").unwrap(), Some(b"good".to_vec()));
    }

    #[test]
    fn memory_delete_is_idempotent() {
        let store = InMemoryObjectStore::new();
        store.upload("l/s/phrase", &mut &b"x"[..]).unwrap();
        assert!(store.delete("l/s/phrase").unwrap());
        assert!(!store.delete("l/s/phrase").unwrap());
        assert!(store.is_empty());
    }

    #[test]
    fn memory_unavailable() {
        let store = InMemoryObjectStore::new();
        store.set_available(false);
        let err = store.fetch("l/s/phrase").unwrap_err();
        assert!(err.is_transient());

        store.set_available(true);
        assert!(store.fetch("l/s/phrase").is_ok());
    }

    #[test]
    fn memory_prefix_listing() {
        let store = InMemoryObjectStore::new();
        store.insert("a/1/phrase", vec![]);
        store.insert("a/1/gloss", vec![]);
        store.insert("a/2/phrase", vec![]);
        store.insert("b/1/phrase", vec![]);

        assert_eq!(store.keys_with_prefix("a/1/"), vec!["a/1/gloss", "a/1/phrase"]);
    }
}
