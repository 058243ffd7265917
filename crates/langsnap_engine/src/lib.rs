//! # Langsnap Engine
//!
//! Moves one language's data between environments as a snapshot of
//! per-resource payloads.
//!
//! This crate provides:
//! - [`ResourcePlugin`], the contract each transferable resource implements,
//!   and [`TablePlugin`], the table-backed implementation most resources use
//! - [`PluginRegistry`] catalogues, ordered so that references point backwards
//! - [`IdMapper`], which rewrites identifiers when importing into an
//!   environment whose keys differ from the source
//! - [`Orchestrator`], the state machine that drives export and import runs
//! - [`store::InMemoryStore`], a relational store with foreign keys,
//!   cascades and bulk load
//!
//! ## Transfer Modes
//!
//! - **Restore** keeps every identifier. The destination scope is cleared
//!   and the snapshot written back unchanged.
//! - **Import** gives owned rows fresh identifiers and rewrites every
//!   reference through the run's mappers. Users must already exist in the
//!   destination; words match by key.
//!
//! ## Key Invariants
//!
//! - Registries run parents before children; [`validate_catalogue`] checks it
//! - A payload is decoded in full before its destination scope is cleared
//! - A failed run reports the resources it completed and does not roll back
//! - Only transient I/O failures are retried
//!
//! ## Usage
//!
//! ```
//! use langsnap_engine::domains::{catalogue, schema};
//! use langsnap_engine::store::InMemoryStore;
//! use langsnap_engine::{EngineConfig, Orchestrator, SnapshotTarget};
//! use langsnap_storage::InMemoryObjectStore;
//! use std::sync::Arc;
//!
//! let store = Arc::new(InMemoryStore::new(schema()));
//! let storage = Arc::new(InMemoryObjectStore::new());
//! let orchestrator = Orchestrator::new(EngineConfig::new(), store, storage);
//!
//! // No language row: the export fails on the scope resource.
//! let err = orchestrator
//!     .export(&catalogue(), &SnapshotTarget::new("missing", "snap-1"))
//!     .unwrap_err();
//! assert!(err.to_string().contains("language missing not found"));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
pub mod domains;
mod error;
mod mapper;
mod orchestrator;
pub mod plugin;
mod record;
mod registry;
mod report;
pub mod store;
mod table;

pub use config::{EngineConfig, RetryConfig, TransferConfig, TransferMode};
pub use error::{TransferError, TransferResult};
pub use mapper::{IdAllocation, IdMapper, IdMappers};
pub use orchestrator::{
    CancelHandle, Orchestrator, RunOptions, SnapshotTarget, TransferState, TransferStats,
};
pub use plugin::{Capabilities, FieldRole, FieldSpec, ResourcePlugin};
pub use record::Record;
pub use registry::{validate_catalogue, PluginRegistry};
pub use report::{Direction, ResourceReport, ResourceStatus, RunReport, SkipReason};
pub use table::TablePlugin;
