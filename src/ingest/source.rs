// src/ingest/source.rs

//! Source package indexing: patches, tarballs, ctags and build requirements

use super::{PackageIngestor, RecordCounts, ScratchDir, grant_owner_rwx};
use crate::db;
use crate::db::models::{
    BuildRequirement, CtagEntry, PackageRef, ReferenceKind, SourceEntry, SourceFileEntry, SourceKind,
};
use crate::error::Result;
use crate::parser::{FileListing, classify_source, parse_build_requirements};
use rusqlite::Connection;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// What was learned about one patch or tarball before storing it
struct SourceRecord {
    kind: SourceKind,
    filename: String,
    files: Vec<String>,
    ctags: Vec<CtagEntry>,
}

impl PackageIngestor<'_> {
    pub(super) fn index_sources(
        &mut self,
        conn: &mut Connection,
        package: PackageRef,
        root: &Path,
        listing: &[FileListing],
        records: &mut RecordCounts,
    ) -> Result<()> {
        let mut sources = Vec::new();
        for entry in listing {
            let filename = base_name(&entry.path);
            let Some(class) = classify_source(&filename) else {
                continue;
            };
            sources.push(self.inspect_member(root, class.kind, filename));
        }

        let buildreqs = match find_spec_file(root) {
            Some(spec) => match fs::read_to_string(&spec) {
                Ok(text) => parse_build_requirements(&text),
                Err(e) => {
                    warn!("Could not read {}: {}", spec.display(), e);
                    Vec::new()
                }
            },
            None => {
                warn!("No spec file found in {}", root.display());
                Vec::new()
            }
        };

        let cache = &mut self.cache;
        let stored = db::transaction(conn, |tx| {
            for source in &sources {
                let source_id = match SourceEntry::new(package, source.kind, source.filename.clone()).insert(tx) {
                    Ok(id) => id,
                    Err(e) => {
                        warn!("Dropping source {}: {}", source.filename, e);
                        records.dropped += 1;
                        continue;
                    }
                };
                records.sources += 1;

                for path in &source.files {
                    match SourceFileEntry::new(package, source_id, path.clone()).insert(tx) {
                        Ok(_) => records.source_files += 1,
                        Err(e) => {
                            warn!("Dropping member {} of {}: {}", path, source.filename, e);
                            records.dropped += 1;
                        }
                    }
                }
                for ctag in &source.ctags {
                    match ctag.insert(tx, package, source_id) {
                        Ok(_) => records.ctags += 1,
                        Err(e) => {
                            warn!("Dropping ctag {} of {}: {}", ctag.name, source.filename, e);
                            records.dropped += 1;
                        }
                    }
                }
            }

            for name in &buildreqs {
                let stored = cache
                    .resolve(tx, ReferenceKind::BuildRequirement, name)
                    .and_then(|name_id| BuildRequirement::new(package, name_id).insert(tx));
                match stored {
                    Ok(_) => records.buildreqs += 1,
                    Err(e) => {
                        warn!("Dropping build requirement {}: {}", name, e);
                        records.dropped += 1;
                    }
                }
            }
            Ok(())
        });

        if stored.is_err() {
            self.cache.clear();
        }
        stored
    }

    /// List a member's contents and, for tarballs, index the extracted tree
    fn inspect_member(&self, root: &Path, kind: SourceKind, filename: String) -> SourceRecord {
        let member = root.join(&filename);
        let mut record = SourceRecord {
            kind,
            filename,
            files: Vec::new(),
            ctags: Vec::new(),
        };

        if !member.is_file() {
            warn!("{} is listed but was not unpacked", record.filename);
            return record;
        }

        match kind {
            SourceKind::Patch => match self.inspector.list_patch_targets(&member) {
                Ok(targets) => record.files = targets,
                Err(e) => warn!("Could not read patch {}: {}", record.filename, e),
            },
            SourceKind::Tarball => {
                match self.inspector.list_tarball(&member) {
                    Ok(files) => record.files = files,
                    Err(e) => warn!("Could not list {}: {}", record.filename, e),
                }
                record.ctags = self.index_tarball(&member);
            }
        }

        debug!(
            "{}: {} files, {} ctags",
            record.filename,
            record.files.len(),
            record.ctags.len()
        );
        record
    }

    fn index_tarball(&self, tarball: &Path) -> Vec<CtagEntry> {
        let tree = match ScratchDir::new("rq-src-") {
            Ok(tree) => tree,
            Err(e) => {
                warn!("Could not create scratch directory for {}: {}", tarball.display(), e);
                return Vec::new();
            }
        };

        if let Err(e) = self.inspector.extract_tarball(tarball, tree.path()) {
            warn!("Could not extract {}: {}", tarball.display(), e);
            return Vec::new();
        }
        grant_owner_rwx(tree.path());

        self.inspector.ctags(tree.path()).unwrap_or_else(|e| {
            warn!("Could not index {}: {}", tarball.display(), e);
            Vec::new()
        })
    }
}

fn base_name(path: &str) -> String {
    path.rsplit('/').next().unwrap_or(path).to_string()
}

/// First `*.spec` file at the top of the unpacked source package
fn find_spec_file(root: &Path) -> Option<PathBuf> {
    let mut specs: Vec<PathBuf> = fs::read_dir(root)
        .ok()?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "spec"))
        .collect();
    specs.sort();
    specs.into_iter().next()
}
