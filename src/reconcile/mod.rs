// src/reconcile/mod.rs

//! Tag reconciliation
//!
//! Brings the packages stored under a tag in line with the package files
//! on disk. A run first builds an [`UpdatePlan`] without writing anything:
//!
//! 1. Without an update path, packages whose file vanished from the tag
//!    path are queued for removal.
//! 2. Files in the scan directory (update path, or tag path) that are not
//!    stored and not in the already-seen ledger become candidates. With an
//!    update path, a candidate sharing its name (and architecture) with a
//!    stored package under a different file name replaces it: the old row
//!    is queued for removal and its file name is ledgered, whatever the
//!    two versions are.
//! 3. Candidates are grouped by name and architecture and only the newest
//!    of each group is kept; the rest go to the ledger.
//!
//! [`TagReconciler::commit`] then applies removals and ledger rows in one
//! transaction and loads the additions through the ingestor.

mod nvr;

pub use nvr::{PackageVersion, compare_segments};

use crate::db;
use crate::db::models::{AlreadySeen, Package, Tag};
use crate::error::{Error, Result};
use crate::ingest::{BatchSummary, PackageIngestor, file_name, list_package_files};
use crate::parser::PackageHeader;
use crate::progress::ProgressTracker;
use crate::tools::PackageInspector;
use rusqlite::Connection;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// A package file queued for addition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub path: PathBuf,
    pub fullname: String,
    pub header: PackageHeader,
}

/// A stored package queued for removal
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Removal {
    pub fullname: String,
    pub package_id: i64,
}

/// What a reconciliation run would do; every list is sorted by file name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdatePlan {
    pub to_add: Vec<Candidate>,
    pub to_remove: Vec<Removal>,
    /// File names to record in the already-seen ledger
    pub seen: Vec<String>,
    /// Files skipped because they are already in the ledger
    pub skipped: Vec<String>,
    /// Files whose header could not be read, with the reason
    pub unreadable: Vec<(String, String)>,
}

impl UpdatePlan {
    /// No additions and no removals
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }
}

impl fmt::Display for UpdatePlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "No changes detected.");
        }
        for removal in &self.to_remove {
            writeln!(f, "Remove: {}", removal.fullname)?;
        }
        for candidate in &self.to_add {
            writeln!(f, "Add: {}", candidate.fullname)?;
        }
        write!(
            f,
            "{} to add, {} to remove, {} superseded, {} skipped",
            self.to_add.len(),
            self.to_remove.len(),
            self.seen.len(),
            self.skipped.len()
        )
    }
}

/// Result of committing an [`UpdatePlan`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateOutcome {
    pub removed: usize,
    /// Ledger rows actually written
    pub ledgered: usize,
    pub additions: BatchSummary,
}

impl UpdateOutcome {
    pub fn changed(&self) -> bool {
        self.removed > 0 || self.additions.added > 0
    }
}

impl fmt::Display for UpdateOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.changed() {
            return write!(f, "No changes detected.");
        }
        write!(
            f,
            "{} removed, {}, {} superseded",
            self.removed, self.additions, self.ledgered
        )
    }
}

/// Plans and applies incremental updates of a tag
pub struct TagReconciler<'a> {
    inspector: &'a dyn PackageInspector,
}

impl<'a> TagReconciler<'a> {
    pub fn new(inspector: &'a dyn PackageInspector) -> Self {
        Self { inspector }
    }

    /// Work out additions, removals and ledger entries without writing
    pub fn plan(&self, conn: &Connection, tag: &Tag) -> Result<UpdatePlan> {
        let scan_dir = Path::new(tag.scan_path());
        if !scan_dir.is_dir() {
            return Err(Error::ValidationError(format!(
                "Path ({}) for tag '{}' is not a valid directory",
                scan_dir.display(),
                tag.name
            )));
        }

        let mut plan = UpdatePlan::default();
        let mut removals: BTreeMap<i64, String> = BTreeMap::new();
        let mut seen: BTreeSet<String> = BTreeSet::new();

        if tag.update_path.is_none() {
            for package in Package::find_by_tag(conn, tag.id)? {
                if !scan_dir.join(&package.fullname).exists()
                    && let Some(id) = package.id
                {
                    debug!("{} is gone from {}", package.fullname, scan_dir.display());
                    removals.insert(id, package.fullname);
                }
            }
        }

        let mut candidates = Vec::new();
        for path in list_package_files(scan_dir, tag.kind)? {
            let fullname = file_name(&path);
            if Package::find_by_fullname(conn, tag.id, &fullname)?.is_some() {
                continue;
            }
            if AlreadySeen::contains(conn, tag.id, &fullname)? {
                plan.skipped.push(fullname);
                continue;
            }

            let header = match self.inspector.package_header(&path, tag.kind) {
                Ok(header) => header,
                Err(e) => {
                    warn!("Cannot read header of {}: {}", fullname, e);
                    plan.unreadable.push((fullname, e.to_string()));
                    continue;
                }
            };

            if tag.update_path.is_some() {
                let existing = Package::find_by_name_arch(conn, tag.id, &header.name, &header.arch)?;
                for old in existing {
                    if let Some(id) = old.id {
                        debug!("{} supersedes {}", fullname, old.fullname);
                        seen.insert(old.fullname.clone());
                        removals.insert(id, old.fullname);
                    }
                }
            }

            candidates.push(Candidate { path, fullname, header });
        }

        let (keep, superseded) = newest_per_name(candidates);
        seen.extend(superseded);

        plan.to_add = keep;
        plan.to_add.sort_by(|a, b| a.fullname.cmp(&b.fullname));
        plan.to_remove = removals
            .into_iter()
            .map(|(package_id, fullname)| Removal { fullname, package_id })
            .collect();
        plan.to_remove.sort();
        plan.seen = seen.into_iter().collect();
        plan.skipped.sort();
        plan.unreadable.sort();

        info!(
            "Plan for tag '{}': {} to add, {} to remove, {} superseded",
            tag.name,
            plan.to_add.len(),
            plan.to_remove.len(),
            plan.seen.len()
        );
        Ok(plan)
    }

    /// Apply `plan` to `tag`
    ///
    /// Removals and ledger rows are written in one transaction, all or
    /// nothing. Additions are then loaded one package at a time as updates.
    pub fn commit(
        &self,
        conn: &mut Connection,
        tag: &mut Tag,
        plan: &UpdatePlan,
        progress: &dyn ProgressTracker,
    ) -> Result<UpdateOutcome> {
        let mut outcome = UpdateOutcome::default();

        let tag_id = tag.id;
        let (removed, ledgered) = db::transaction(conn, |tx| {
            for removal in &plan.to_remove {
                Package::delete(tx, removal.package_id)?;
                debug!("Removed {}", removal.fullname);
            }
            let mut ledgered = 0;
            for fullname in &plan.seen {
                if AlreadySeen::insert(tx, tag_id, fullname)? {
                    ledgered += 1;
                }
            }
            Ok((plan.to_remove.len(), ledgered))
        })?;
        outcome.removed = removed;
        outcome.ledgered = ledgered;

        if !plan.to_add.is_empty() {
            let files: Vec<PathBuf> = plan.to_add.iter().map(|c| c.path.clone()).collect();
            let mut ingestor = PackageIngestor::new(self.inspector, tag.kind);
            outcome.additions = ingestor.add_files(conn, tag, &files, true, progress)?;
        }

        if outcome.changed() {
            tag.touch_updated(conn)?;
        }
        info!("Update of tag '{}': {}", tag.name, outcome);
        Ok(outcome)
    }
}

/// Keep the newest candidate per (name, arch); return the rest's file names
fn newest_per_name(candidates: Vec<Candidate>) -> (Vec<Candidate>, Vec<String>) {
    let mut groups: BTreeMap<(String, String), Vec<Candidate>> = BTreeMap::new();
    for candidate in candidates {
        let key = (candidate.header.name.clone(), candidate.header.arch.clone());
        groups.entry(key).or_default().push(candidate);
    }

    let mut keep = Vec::new();
    let mut superseded = Vec::new();
    for (_, mut group) in groups {
        // newest first, file name breaks ties so the choice is stable
        group.sort_by(|a, b| {
            PackageVersion::of(&b.header)
                .cmp(&PackageVersion::of(&a.header))
                .then_with(|| a.fullname.cmp(&b.fullname))
        });
        let mut members = group.into_iter();
        if let Some(newest) = members.next() {
            keep.push(newest);
        }
        superseded.extend(members.map(|c| c.fullname));
    }
    (keep, superseded)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(fullname: &str, name: &str, version: &str, release: &str, arch: &str) -> Candidate {
        Candidate {
            path: PathBuf::from("/repo").join(fullname),
            fullname: fullname.to_string(),
            header: PackageHeader {
                name: name.to_string(),
                version: version.to_string(),
                release: release.to_string(),
                build_time: "0".to_string(),
                arch: arch.to_string(),
                source_rpm: None,
            },
        }
    }

    #[test]
    fn test_newest_per_name() {
        let (keep, superseded) = newest_per_name(vec![
            candidate("foo-1.0-1.x86_64.rpm", "foo", "1.0", "1", "x86_64"),
            candidate("foo-1.1-1.x86_64.rpm", "foo", "1.1", "1", "x86_64"),
            candidate("foo-1.0-1.i686.rpm", "foo", "1.0", "1", "i686"),
            candidate("bar-2.10-1.x86_64.rpm", "bar", "2.10", "1", "x86_64"),
            candidate("bar-2.9-1.x86_64.rpm", "bar", "2.9", "1", "x86_64"),
        ]);

        let mut kept: Vec<&str> = keep.iter().map(|c| c.fullname.as_str()).collect();
        kept.sort();
        assert_eq!(
            kept,
            vec!["bar-2.10-1.x86_64.rpm", "foo-1.0-1.i686.rpm", "foo-1.1-1.x86_64.rpm"]
        );

        let mut superseded = superseded;
        superseded.sort();
        assert_eq!(superseded, vec!["bar-2.9-1.x86_64.rpm", "foo-1.0-1.x86_64.rpm"]);
    }

    #[test]
    fn test_plan_display() {
        let plan = UpdatePlan::default();
        assert_eq!(plan.to_string(), "No changes detected.");

        let plan = UpdatePlan {
            to_add: vec![candidate("foo-1.1-1.x86_64.rpm", "foo", "1.1", "1", "x86_64")],
            to_remove: vec![Removal {
                fullname: "foo-1.0-1.x86_64.rpm".to_string(),
                package_id: 1,
            }],
            seen: vec!["foo-1.0-1.x86_64.rpm".to_string()],
            ..Default::default()
        };
        let text = plan.to_string();
        assert!(text.contains("Remove: foo-1.0-1.x86_64.rpm"));
        assert!(text.contains("Add: foo-1.1-1.x86_64.rpm"));
        assert!(text.ends_with("1 to add, 1 to remove, 1 superseded, 0 skipped"));
    }
}
