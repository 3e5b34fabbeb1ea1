//! Markdown tree to Confluence page tree synchronization.
//!
//! This crate maps a directory of markdown documents onto a tree of remote
//! pages and keeps the two in step across repeated runs.
//!
//! # Architecture
//!
//! - [`load`] builds a [`DocumentTree`] from a source directory
//! - [`Resolver`] finds each node's existing page by title
//! - [`plan`] decides create, update or skip for one node
//! - [`SyncEngine`] applies the actions parent before child and reports
//!   per-node outcomes in a [`SyncReport`]
//!
//! Conversion and remote access are injected through the [`Converter`] and
//! [`RemotePages`] traits. [`DryRunRemote`] wraps any remote to record writes
//! without performing them, and `MockRemote` (behind the `mock` feature) is an
//! in-memory remote for tests.
//!
//! # Example
//!
//! ```ignore
//! use std::path::Path;
//! use d2c_sync::{SyncEngine, SyncOptions, load};
//!
//! let tree = load(Path::new("docs"))?;
//! let engine = SyncEngine::new(client, renderer, SyncOptions::new("DOCS"));
//! let report = engine.run(&tree);
//! assert!(report.is_success());
//! ```

mod convert;
mod dry_run;
mod error;
mod executor;
mod loader;
mod markup;
#[cfg(any(test, feature = "mock"))]
mod mock;
mod planner;
mod remote;
mod report;
mod tree;

pub use convert::Converter;
pub use dry_run::{DryRunRemote, PlannedWrite};
pub use error::{ConversionError, LoadError, NodeError, RemoteError};
pub use executor::{CancelFlag, FailurePolicy, SyncEngine, SyncOptions};
pub use loader::load;
#[cfg(any(test, feature = "mock"))]
pub use mock::{MockRemote, RemoteCall, RemoteOp};
pub use planner::{SyncAction, markup_eq, plan};
pub use remote::{PageVersion, RemotePageRef, RemotePages, Resolver};
pub use report::{NodeOutcome, NodeReport, Summary, SyncReport};
pub use tree::{DocumentNode, DocumentTree, NodeId, PageId, RemoteIds, SyncSlot};
