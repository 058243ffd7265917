//! # Langsnap Jobs
//!
//! Job handlers invoked by the queue collaborator.
//!
//! This crate provides:
//! - [`ExportJob`] / [`ImportJob`] payloads and the [`JobReport`] result
//! - [`TransferJobs`], which runs one transfer per invocation
//! - [`ExportCleanupJob`], the scheduled retention pass over export artifacts
//!
//! The queue delivers at least once and owns job-level retries; a handler
//! only reports whether a failure is worth redelivering.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod cleanup;
mod config;
mod error;
mod handler;
mod payload;

pub use cleanup::{ArtifactRepository, CleanupReport, ExportArtifact, ExportCleanupJob, InMemoryArtifactRepository};
pub use config::{JobConfig, RetentionConfig, MAX_FALLBACK_DAYS};
pub use error::{JobError, JobResult};
pub use handler::{CatalogueFn, TransferJobs};
pub use payload::{ExportJob, ImportJob, JobReport};
