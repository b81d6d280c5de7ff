// src/tools/inspector.rs

use super::ToolRunner;
use crate::config::{Config, IngestSection, ToolsSection};
use crate::db::models::{CtagEntry, CtagKind, DependencyKind, HardeningFlags, PackageKind};
use crate::error::{Error, Result};
use crate::parser::{FileListing, PackageHeader};
use std::path::Path;

/// Typed access to everything rq learns from external tools.
///
/// [`SystemInspector`] runs the real programs; tests substitute fixtures.
pub trait PackageInspector {
    /// Name, version, release, build time, architecture and source package
    fn package_header(&self, package: &Path, kind: PackageKind) -> Result<PackageHeader>;

    /// The package's file listing, administrative files excluded
    fn list_files(&self, package: &Path) -> Result<Vec<FileListing>>;

    /// Provides or requires names; requires are filtered for runtime noise
    fn dependencies(&self, package: &Path, kind: DependencyKind) -> Result<Vec<String>>;

    /// Unpack the payload into `dest`
    fn explode(&self, package: &Path, dest: &Path) -> Result<()>;

    /// Hardening flags of one ELF file
    fn inspect_elf(&self, file: &Path) -> Result<HardeningFlags>;

    /// Exported dynamic symbols of one ELF file, runtime noise removed
    fn list_symbols(&self, file: &Path) -> Result<Vec<String>>;

    /// Member files of a tarball, directories and excluded paths removed
    fn list_tarball(&self, archive: &Path) -> Result<Vec<String>>;

    /// Files a (possibly compressed) patch touches
    fn list_patch_targets(&self, patch: &Path) -> Result<Vec<String>>;

    /// Extract a tarball into `dest`, skipping excluded paths
    fn extract_tarball(&self, archive: &Path, dest: &Path) -> Result<()>;

    /// Index an extracted source tree, keeping the configured kinds
    fn ctags(&self, tree: &Path) -> Result<Vec<CtagEntry>>;
}

/// [`PackageInspector`] backed by the system's rpm, binutils, tar and ctags
#[derive(Debug, Clone)]
pub struct SystemInspector {
    pub(super) runner: ToolRunner,
    pub(super) tools: ToolsSection,
    pub(super) ingest: IngestSection,
    pub(super) ctag_kinds: Vec<CtagKind>,
}

impl SystemInspector {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            runner: ToolRunner::new(config.tools.timeout()),
            tools: config.tools.clone(),
            ingest: config.ingest.clone(),
            ctag_kinds: config.ingest.ctag_kinds()?,
        })
    }

    /// Configured programs that cannot be found, for `kind` packages
    pub fn missing_tools(&self, kind: PackageKind) -> Vec<String> {
        let t = &self.tools;
        let needed: Vec<&String> = match kind {
            PackageKind::Binary => vec![&t.rpm, &t.rpm2cpio, &t.cpio, &t.readelf, &t.nm],
            PackageKind::Source => vec![&t.rpm, &t.rpm2cpio, &t.cpio, &t.tar, &t.ctags, &t.bzip2],
        };
        needed
            .into_iter()
            .filter(|program| which::which(program.as_str()).is_err())
            .cloned()
            .collect()
    }

    /// Fail with a `ToolError` naming every missing program
    pub fn ensure_available(&self, kind: PackageKind) -> Result<()> {
        let missing = self.missing_tools(kind);
        if missing.is_empty() {
            return Ok(());
        }
        Err(Error::ToolError(format!(
            "Required programs not found: {}",
            missing.join(", ")
        )))
    }
}

impl PackageInspector for SystemInspector {
    fn package_header(&self, package: &Path, kind: PackageKind) -> Result<PackageHeader> {
        self.query_header(package, kind)
    }

    fn list_files(&self, package: &Path) -> Result<Vec<FileListing>> {
        self.query_files(package)
    }

    fn dependencies(&self, package: &Path, kind: DependencyKind) -> Result<Vec<String>> {
        self.query_dependencies(package, kind)
    }

    fn explode(&self, package: &Path, dest: &Path) -> Result<()> {
        self.explode_payload(package, dest)
    }

    fn inspect_elf(&self, file: &Path) -> Result<HardeningFlags> {
        self.classify_file(file)
    }

    fn list_symbols(&self, file: &Path) -> Result<Vec<String>> {
        self.dynamic_symbols(file)
    }

    fn list_tarball(&self, archive: &Path) -> Result<Vec<String>> {
        self.list_archive(archive)
    }

    fn list_patch_targets(&self, patch: &Path) -> Result<Vec<String>> {
        self.patch_targets(patch)
    }

    fn extract_tarball(&self, archive: &Path, dest: &Path) -> Result<()> {
        self.extract_archive(archive, dest)
    }

    fn ctags(&self, tree: &Path) -> Result<Vec<CtagEntry>> {
        self.index_tree(tree)
    }
}
