// src/lib.rs

//! rq - RPM and SRPM package catalog
//!
//! Catalogs the contents of binary and source RPM packages into SQLite and
//! answers substring and regex queries against that catalog.
//!
//! # Architecture
//!
//! - Tags: a named directory tree of packages; every record belongs to one tag
//! - Ingestion: external tools (`rpm`, binutils, `tar`, `ctags`) behind the
//!   [`tools::PackageInspector`] seam, their output parsed by [`parser`]
//! - Reconciliation: incremental re-sync of a tag against its directory,
//!   with an already-seen ledger for superseded files
//! - Queries: read-only projections over the catalog

pub mod cache;
pub mod config;
pub mod db;
mod error;
pub mod ingest;
pub mod parser;
pub mod progress;
pub mod query;
pub mod reconcile;
pub mod tools;

pub use cache::ReferenceCache;
pub use config::Config;
pub use db::models::{PackageKind, Tag};
pub use error::{Error, Result};
pub use ingest::{AddOutcome, BatchSummary, PackageIngestor};
pub use progress::{CliProgress, ProgressTracker, SilentProgress};
pub use reconcile::{TagReconciler, UpdateOutcome, UpdatePlan};
pub use tools::{PackageInspector, SystemInspector};
