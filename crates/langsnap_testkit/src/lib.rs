//! # Langsnap Testkit
//!
//! Test utilities for the language snapshot transfer engine.
//!
//! This crate provides:
//! - Stores seeded with the example language graph
//! - Test environments wiring a store and an object store to an orchestrator
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust
//! use langsnap_engine::domains::catalogue;
//! use langsnap_engine::SnapshotTarget;
//! use langsnap_testkit::{TestEnvironment, ENG_ID};
//!
//! let (env, _) = TestEnvironment::seeded();
//! let report = env
//!     .orchestrator()
//!     .export(&catalogue(), &SnapshotTarget::new(ENG_ID, "snap-1"))
//!     .unwrap();
//! assert_eq!(report.resources_processed(), 10);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;

pub use fixtures::*;
pub use generators::*;
