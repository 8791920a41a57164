//! pinwalk-core library.
//!
//! Recursive discovery of the CI actions a repository depends on, with
//! integrity checks on the container images those actions run.
//!
//! # Conventions
//!
//! - **Errors**: one `thiserror` enum per module; recoverable problems during
//!   a scan become warnings on the graph node they concern.
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `debug!`).

pub mod config;
pub mod document;
pub mod error;
pub mod inspect;
pub mod lock;
pub mod reference;
pub mod report;
pub mod source;
pub mod traversal;
pub mod workflow;

pub use reference::{ActionRef, MalformedReferenceError, NodeKey, ROOT_LABEL};
pub use report::ScanReport;
pub use source::{AcquireError, RepositorySource};
pub use traversal::{ScanError, ScanLimits, ScanOutcome, Traversal};
