// src/ingest/mod.rs

//! Package ingestion
//!
//! [`PackageIngestor`] loads one package file into one tag: it reads the
//! header, skips packages already filed under the tag, stores the package
//! with its file list and dependencies, then unpacks the payload to index
//! ELF hardening and symbols (binary packages) or sources, ctags and build
//! requirements (source packages).
//!
//! Expected outcomes are returned as [`AddOutcome`] values. A failing tool
//! makes the package `Failed` without touching the store; a single record
//! that cannot be stored is logged and dropped while the rest of the
//! package is kept.

mod binary;
mod scratch;
mod source;

pub use scratch::{ScratchDir, grant_owner_rwx};

use crate::cache::ReferenceCache;
use crate::db;
use crate::db::models::{
    DependencyEntry, DependencyKind, FileEntry, Package, PackageKind, PackageRef, ReferenceKind, Tag,
};
use crate::error::{Error, Result};
use crate::parser::{FileListing, PackageHeader};
use crate::progress::ProgressTracker;
use crate::tools::PackageInspector;
use rusqlite::{Connection, Transaction};
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Lead magic at the start of every RPM file
const RPM_MAGIC: [u8; 4] = [0xED, 0xAB, 0xEE, 0xDB];

/// Counts of child records stored for one package
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordCounts {
    pub files: usize,
    pub provides: usize,
    pub requires: usize,
    pub elf_files: usize,
    pub symbols: usize,
    pub sources: usize,
    pub source_files: usize,
    pub ctags: usize,
    pub buildreqs: usize,
    /// Records that failed to store and were dropped
    pub dropped: usize,
}

/// A package that was stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddedPackage {
    pub package: PackageRef,
    pub fullname: String,
    pub records: RecordCounts,
}

/// Result of adding one package file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddOutcome {
    Added(AddedPackage),
    /// Already present under the tag
    Skipped { reason: String },
    /// A tool failed; nothing was stored
    Failed { reason: String },
}

impl AddOutcome {
    pub fn is_added(&self) -> bool {
        matches!(self, AddOutcome::Added(_))
    }
}

impl fmt::Display for AddOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddOutcome::Added(added) => {
                let r = &added.records;
                write!(f, "Added {} ({} files", added.fullname, r.files)?;
                if r.elf_files > 0 {
                    write!(f, ", {} ELF files, {} symbols", r.elf_files, r.symbols)?;
                }
                if r.sources > 0 {
                    write!(
                        f,
                        ", {} sources, {} source files, {} ctags, {} build requirements",
                        r.sources, r.source_files, r.ctags, r.buildreqs
                    )?;
                }
                if r.dropped > 0 {
                    write!(f, ", {} records dropped", r.dropped)?;
                }
                write!(f, ")")
            }
            AddOutcome::Skipped { reason } => write!(f, "Skipped: {}", reason),
            AddOutcome::Failed { reason } => write!(f, "Failed: {}", reason),
        }
    }
}

/// Totals for a batch of package additions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub added: usize,
    pub skipped: usize,
    pub failed: usize,
    /// File name and reason of each failure
    pub failures: Vec<(String, String)>,
}

impl BatchSummary {
    pub fn record(&mut self, fullname: &str, outcome: &AddOutcome) {
        match outcome {
            AddOutcome::Added(_) => self.added += 1,
            AddOutcome::Skipped { .. } => self.skipped += 1,
            AddOutcome::Failed { reason } => {
                self.failed += 1;
                self.failures.push((fullname.to_string(), reason.clone()));
            }
        }
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} added, {} skipped, {} failed",
            self.added, self.skipped, self.failed
        )
    }
}

/// Check that `path` is a package of the expected kind, by extension and lead magic
pub fn validate_package_file(path: &Path, kind: PackageKind) -> Result<()> {
    let file_name = file_name(path);
    if !kind.matches_file_name(&file_name) {
        return Err(Error::ValidationError(format!(
            "{} is not a valid {} file",
            path.display(),
            kind.label()
        )));
    }

    let mut magic = [0u8; 4];
    File::open(path)
        .and_then(|mut f| f.read_exact(&mut magic))
        .map_err(|e| Error::ValidationError(format!("Cannot read {}: {}", path.display(), e)))?;
    if magic != RPM_MAGIC {
        return Err(Error::ValidationError(format!(
            "{} is not a valid {} file (bad magic)",
            path.display(),
            kind.label()
        )));
    }

    Ok(())
}

/// Package files of `kind` directly inside `dir`, sorted by name
pub fn list_package_files(dir: &Path, kind: PackageKind) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(Error::ValidationError(format!(
            "Path ({}) is not a valid directory",
            dir.display()
        )));
    }

    let suffix = match kind {
        PackageKind::Binary => "*.rpm",
        PackageKind::Source => "*.src.rpm",
    };
    let pattern = format!("{}/{}", glob::Pattern::escape(&dir.to_string_lossy()), suffix);
    let paths = glob::glob(&pattern)
        .map_err(|e| Error::ValidationError(format!("Bad directory pattern {}: {}", pattern, e)))?;

    let mut files: Vec<PathBuf> = paths
        .filter_map(|p| match p {
            Ok(path) => Some(path),
            Err(e) => {
                warn!("Skipping unreadable entry: {}", e);
                None
            }
        })
        .filter(|p| p.is_file() && kind.matches_file_name(&file_name(p)))
        .collect();
    files.sort();
    Ok(files)
}

pub(crate) fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Loads package files into the store
pub struct PackageIngestor<'a> {
    inspector: &'a dyn PackageInspector,
    kind: PackageKind,
    cache: ReferenceCache,
}

impl<'a> PackageIngestor<'a> {
    /// Create an ingestor with a fresh reference cache for this run
    pub fn new(inspector: &'a dyn PackageInspector, kind: PackageKind) -> Self {
        Self {
            inspector,
            kind,
            cache: ReferenceCache::new(),
        }
    }

    pub fn kind(&self) -> PackageKind {
        self.kind
    }

    pub fn cache(&self) -> &ReferenceCache {
        &self.cache
    }

    /// Add every package file found directly in `dir`
    pub fn add_directory(
        &mut self,
        conn: &mut Connection,
        tag: &Tag,
        dir: &Path,
        progress: &dyn ProgressTracker,
    ) -> Result<BatchSummary> {
        let files = list_package_files(dir, self.kind)?;
        info!("Found {} {} files in {}", files.len(), self.kind.label(), dir.display());
        self.add_files(conn, tag, &files, false, progress)
    }

    /// Add the given files, tallying outcomes; files that fail validation count as failed
    pub fn add_files(
        &mut self,
        conn: &mut Connection,
        tag: &Tag,
        files: &[PathBuf],
        is_update: bool,
        progress: &dyn ProgressTracker,
    ) -> Result<BatchSummary> {
        let mut summary = BatchSummary::default();
        progress.set_length(files.len() as u64);

        for path in files {
            let fullname = file_name(path);
            progress.set_message(&fullname);

            let outcome = match self.add_package(conn, tag, path, is_update) {
                Ok(outcome) => outcome,
                Err(Error::ValidationError(reason)) => AddOutcome::Failed { reason },
                Err(e) => return Err(e),
            };
            match &outcome {
                AddOutcome::Added(_) => info!("{}", outcome),
                AddOutcome::Skipped { reason } => info!("Skipping {}: {}", fullname, reason),
                AddOutcome::Failed { reason } => error!("Failed to add {}: {}", fullname, reason),
            }
            summary.record(&fullname, &outcome);
            progress.increment(1);
        }

        progress.finish_with_message(&summary.to_string());
        Ok(summary)
    }

    /// Add one package file to `tag`
    pub fn add_package(
        &mut self,
        conn: &mut Connection,
        tag: &Tag,
        path: &Path,
        is_update: bool,
    ) -> Result<AddOutcome> {
        if tag.kind != self.kind {
            return Err(Error::ValidationError(format!(
                "Tag '{}' holds {} packages, not {} packages",
                tag.name, tag.kind, self.kind
            )));
        }
        validate_package_file(path, self.kind)?;

        let fullname = file_name(path);
        debug!("Adding {} to tag '{}' (update={})", fullname, tag.name, is_update);

        let header = match self.inspector.package_header(path, self.kind) {
            Ok(header) => header,
            Err(e) => return Ok(AddOutcome::Failed { reason: e.to_string() }),
        };

        if Package::exists(conn, tag.id, &header.name, &header.version, &header.release, &header.arch)? {
            return Ok(AddOutcome::Skipped {
                reason: format!(
                    "{}-{}-{}.{} is already in tag '{}'",
                    header.name, header.version, header.release, header.arch, tag.name
                ),
            });
        }

        let listing = match self.inspector.list_files(path) {
            Ok(listing) => listing,
            Err(e) => return Ok(AddOutcome::Failed { reason: e.to_string() }),
        };

        let (provides, requires) = match self.kind {
            PackageKind::Binary => (
                self.fetch_dependencies(path, DependencyKind::Provides),
                self.fetch_dependencies(path, DependencyKind::Requires),
            ),
            PackageKind::Source => (Vec::new(), Vec::new()),
        };

        let mut package = new_package(tag, &header, fullname.clone(), is_update);
        let mut records = RecordCounts::default();

        let cache = &mut self.cache;
        let kind = self.kind;
        let stored = db::transaction(conn, |tx| {
            let pref = package.insert(tx)?;
            if kind == PackageKind::Binary {
                store_files(tx, cache, pref, &listing, &mut records);
                store_dependencies(tx, cache, pref, DependencyKind::Provides, &provides, &mut records);
                store_dependencies(tx, cache, pref, DependencyKind::Requires, &requires, &mut records);
            }
            Ok(pref)
        });

        let pref = match stored {
            Ok(pref) => pref,
            Err(e) => {
                // ids created inside the rolled-back transaction are gone
                self.cache.clear();
                if e.is_constraint_violation() {
                    return Ok(AddOutcome::Skipped {
                        reason: format!("{} was added to tag '{}' concurrently", fullname, tag.name),
                    });
                }
                return Err(e);
            }
        };

        match ScratchDir::new("rq-") {
            Ok(scratch) => match self.inspector.explode(path, scratch.path()) {
                Ok(()) => match self.kind {
                    PackageKind::Binary => self.index_binaries(conn, pref, scratch.path(), &mut records)?,
                    PackageKind::Source => {
                        self.index_sources(conn, pref, scratch.path(), &listing, &mut records)?
                    }
                },
                Err(e) => warn!("Could not unpack {}: {}", fullname, e),
            },
            Err(e) => warn!("Could not create scratch directory for {}: {}", fullname, e),
        }

        Ok(AddOutcome::Added(AddedPackage {
            package: pref,
            fullname,
            records,
        }))
    }

    fn fetch_dependencies(&self, path: &Path, kind: DependencyKind) -> Vec<String> {
        match self.inspector.dependencies(path, kind) {
            Ok(deps) => deps,
            Err(e) => {
                warn!("Could not read {} of {}: {}", kind, path.display(), e);
                Vec::new()
            }
        }
    }
}

fn new_package(tag: &Tag, header: &PackageHeader, fullname: String, is_update: bool) -> Package {
    let mut package = Package::new(
        tag.id,
        header.name.clone(),
        header.version.clone(),
        header.release.clone(),
        header.arch.clone(),
        fullname,
    );
    package.build_date = header.build_time.clone();
    package.source_rpm = header.source_rpm.clone();
    package.is_update = is_update;
    package
}

fn store_files(
    tx: &Transaction,
    cache: &mut ReferenceCache,
    pref: PackageRef,
    listing: &[FileListing],
    records: &mut RecordCounts,
) {
    for entry in listing {
        let stored = cache
            .resolve(tx, ReferenceKind::User, &entry.owner)
            .and_then(|uid| Ok((uid, cache.resolve(tx, ReferenceKind::Group, &entry.group)?)))
            .and_then(|(uid, gid)| {
                FileEntry::new(pref, entry.path.clone(), uid, gid, entry.perms.clone()).insert(tx)
            });
        match stored {
            Ok(_) => records.files += 1,
            Err(e) => {
                warn!("Dropping file record {}: {}", entry.path, e);
                records.dropped += 1;
            }
        }
    }
}

fn store_dependencies(
    tx: &Transaction,
    cache: &mut ReferenceCache,
    pref: PackageRef,
    kind: DependencyKind,
    names: &[String],
    records: &mut RecordCounts,
) {
    for name in names {
        let stored = cache
            .resolve(tx, ReferenceKind::Capability, name)
            .and_then(|cap| DependencyEntry::new(pref, kind, cap).insert(tx));
        match stored {
            Ok(_) => match kind {
                DependencyKind::Provides => records.provides += 1,
                DependencyKind::Requires => records.requires += 1,
            },
            Err(e) => {
                warn!("Dropping {} record {}: {}", kind, name, e);
                records.dropped += 1;
            }
        }
    }
}
