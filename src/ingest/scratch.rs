// src/ingest/scratch.rs

//! Scratch directories for unpacked package payloads

use crate::error::Result;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// A temporary directory removed when dropped.
///
/// Package payloads sometimes contain read-only directories that block
/// removal. If the first removal fails, owner `rwx` is granted on the
/// whole tree and removal is retried once; if that fails too the directory
/// is left behind with a warning.
#[derive(Debug)]
pub struct ScratchDir {
    dir: Option<TempDir>,
    path: PathBuf,
}

impl ScratchDir {
    pub fn new(prefix: &str) -> Result<Self> {
        let dir = tempfile::Builder::new().prefix(prefix).tempdir()?;
        let path = dir.path().to_path_buf();
        debug!("Created scratch directory {}", path.display());
        Ok(Self { dir: Some(dir), path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        let Some(dir) = self.dir.take() else {
            return;
        };

        if let Err(e) = dir.close() {
            debug!(
                "Removing {} failed ({}), granting owner permissions and retrying",
                self.path.display(),
                e
            );
            grant_owner_rwx(&self.path);
            if let Err(e) = std::fs::remove_dir_all(&self.path) {
                warn!("Leaving scratch directory {} behind: {}", self.path.display(), e);
            }
        }
    }
}

/// Recursively add `u+rwx` to every file and directory under `root`
pub fn grant_owner_rwx(root: &Path) {
    // a directory's own mode is fixed before walkdir reads its entries
    for entry in WalkDir::new(root).follow_links(false).into_iter().flatten() {
        if entry.file_type().is_symlink() {
            continue;
        }
        let Ok(metadata) = entry.metadata() else {
            continue;
        };
        let mut perms = metadata.permissions();
        let mode = perms.mode();
        if mode & 0o700 != 0o700 {
            perms.set_mode(mode | 0o700);
            if let Err(e) = std::fs::set_permissions(entry.path(), perms) {
                debug!("chmod u+rwx {} failed: {}", entry.path().display(), e);
            }
        }
    }
}
