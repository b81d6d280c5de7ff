// src/ingest/binary.rs

//! ELF hardening and symbol indexing for unpacked binary packages

use super::{PackageIngestor, RecordCounts};
use crate::db;
use crate::db::models::{FileEntry, HardeningFlags, PackageRef, SymbolEntry};
use crate::error::Result;
use crate::tools::is_elf;
use rusqlite::Connection;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

struct ElfRecord {
    file_id: i64,
    path: String,
    flags: HardeningFlags,
    symbols: Vec<String>,
}

impl PackageIngestor<'_> {
    /// Inspect every owner-executable ELF file under `root` and store its
    /// hardening flags and exported symbols against the matching file row
    pub(super) fn index_binaries(
        &mut self,
        conn: &mut Connection,
        package: PackageRef,
        root: &Path,
        records: &mut RecordCounts,
    ) -> Result<()> {
        let mut analysed = Vec::new();

        for (file, installed) in find_executables(root) {
            let Some(file_id) = FileEntry::find_id_by_path(conn, package.id, &installed)? else {
                debug!("{} is not in the file listing, skipping", installed);
                continue;
            };

            let flags = match self.inspector.inspect_elf(&file) {
                Ok(flags) => flags,
                Err(e) => {
                    warn!("Could not inspect {}: {}", installed, e);
                    continue;
                }
            };
            let symbols = self.inspector.list_symbols(&file).unwrap_or_else(|e| {
                warn!("Could not list symbols of {}: {}", installed, e);
                Vec::new()
            });

            analysed.push(ElfRecord {
                file_id,
                path: installed,
                flags,
                symbols,
            });
        }

        if analysed.is_empty() {
            return Ok(());
        }

        db::transaction(conn, |tx| {
            for elf in &analysed {
                match elf.flags.insert(tx, package, elf.file_id) {
                    Ok(_) => records.elf_files += 1,
                    Err(e) => {
                        warn!("Dropping flags of {}: {}", elf.path, e);
                        records.dropped += 1;
                        continue;
                    }
                }
                for name in &elf.symbols {
                    match SymbolEntry::new(package, elf.file_id, name.clone()).insert(tx) {
                        Ok(_) => records.symbols += 1,
                        Err(e) => {
                            warn!("Dropping symbol {} of {}: {}", name, elf.path, e);
                            records.dropped += 1;
                        }
                    }
                }
            }
            Ok(())
        })
    }
}

/// Regular files with the owner execute bit that start with the ELF magic,
/// paired with their installed path (`./usr/bin/x` becomes `/usr/bin/x`)
fn find_executables(root: &Path) -> Vec<(PathBuf, String)> {
    let mut found: Vec<(PathBuf, String)> = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry
                .metadata()
                .map(|m| m.permissions().mode() & 0o100 != 0)
                .unwrap_or(false)
        })
        .filter(|entry| is_elf(entry.path()))
        .filter_map(|entry| {
            let relative = entry.path().strip_prefix(root).ok()?;
            let installed = format!("/{}", relative.to_string_lossy());
            Some((entry.into_path(), installed))
        })
        .collect();
    found.sort_by(|a, b| a.1.cmp(&b.1));
    found
}
