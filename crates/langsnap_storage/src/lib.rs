//! # Langsnap Storage
//!
//! The object-storage boundary for language snapshots.
//!
//! Snapshot storage is an **opaque object store**: it uploads, fetches and
//! deletes byte payloads by key and never interprets them. A snapshot has no
//! lifecycle record of its own; it exists as the set of objects under its
//! `{languageId}/{snapshotId}/` prefix.
//!
//! ## Design Principles
//!
//! - Uploads consume a [`std::io::Read`] so payloads stream through
//! - A missing object is `Ok(None)` from [`SnapshotStorage::fetch`], never an error
//! - Deleting a missing object succeeds
//! - Implementations must be `Send + Sync`
//!
//! ## Available Stores
//!
//! - [`InMemoryObjectStore`] - For testing and ephemeral use
//! - [`FileObjectStore`] - A bucket rooted at a local directory
//!
//! ## Example
//!
//! ```rust
//! use langsnap_storage::{InMemoryObjectStore, SnapshotKey, SnapshotStorage};
//!
//! let store = InMemoryObjectStore::new();
//! let key = SnapshotKey::new("lang-1", "snap-1", "phrase").unwrap();
//! store.upload(key.as_str(), &mut &b"1\t2\n\\.\n"[..]).unwrap();
//! assert_eq!(store.fetch(key.as_str()).unwrap().unwrap(), b"1\t2\n\\.\n");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod file;
mod key;
mod memory;
mod repository;

pub use error::{StorageError, StorageResult};
pub use file::FileObjectStore;
pub use key::SnapshotKey;
pub use memory::InMemoryObjectStore;
pub use repository::{Locator, SnapshotStorage};
