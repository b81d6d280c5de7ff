// tests/common/mod.rs

//! Shared test utilities and helpers for integration tests.
//!
//! [`FixtureInspector`] stands in for rpm, binutils, tar and ctags. Each
//! package is described in memory; the files on disk are tiny stand-ins
//! that only carry the RPM lead magic.

#![allow(dead_code)]

use rq::db::models::{
    CtagEntry, CtagKind, DependencyKind, Fortify, HardeningFlags, Nx, Pie, Relro, StackProtector,
};
use rq::parser::{
    FileListing, PackageHeader, filter_symbols, parse_dependencies, parse_file_listing,
    parse_patch_targets, parse_tar_listing,
};
use rq::{Config, Error, PackageInspector, PackageKind, Result};
use rusqlite::Connection;
use std::collections::HashMap;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use walkdir::WalkDir;

const RPM_MAGIC: [u8; 4] = [0xED, 0xAB, 0xEE, 0xDB];
const ELF_MAGIC: &[u8] = b"\x7fELF";

/// Flags every fixture ELF file reports
pub const FIXTURE_FLAGS: HardeningFlags = HardeningFlags {
    relro: Relro::Full,
    ssp: StackProtector::Found,
    pie: Pie::Enabled,
    fortify: Fortify::Found,
    nx: Nx::Enabled,
};

/// A file unpacked from a fixture package's payload
#[derive(Debug, Clone)]
pub struct PayloadFile {
    /// Path relative to the unpack directory, e.g. `usr/bin/bash`
    pub path: String,
    pub contents: Vec<u8>,
    pub mode: u32,
}

impl PayloadFile {
    /// An executable ELF stand-in whose dynamic symbols are `symbols`
    pub fn elf(path: &str, symbols: &[&str]) -> Self {
        let mut contents = ELF_MAGIC.to_vec();
        contents.push(b'\n');
        contents.extend(symbols.join("\n").into_bytes());
        Self {
            path: path.to_string(),
            contents,
            mode: 0o755,
        }
    }

    pub fn text(path: &str, text: &str, mode: u32) -> Self {
        Self {
            path: path.to_string(),
            contents: text.as_bytes().to_vec(),
            mode,
        }
    }
}

/// Canned description of one package file
#[derive(Debug, Clone)]
pub struct FixturePackage {
    pub header: PackageHeader,
    /// `rpm -qlvp` style listing
    pub listing: String,
    pub provides: Vec<String>,
    pub requires: Vec<String>,
    pub payload: Vec<PayloadFile>,
}

/// A binary package whose listing holds `paths` as root-owned 0755 files
pub fn binary(name: &str, version: &str, release: &str, arch: &str, paths: &[&str]) -> FixturePackage {
    let listing = paths
        .iter()
        .map(|p| format!("-rwxr-xr-x    1 root     root        52984 Jan 28  2020 {}\n", p))
        .collect();
    FixturePackage {
        header: PackageHeader {
            name: name.to_string(),
            version: version.to_string(),
            release: release.to_string(),
            build_time: "1580212343".to_string(),
            arch: arch.to_string(),
            source_rpm: Some(name.to_string()),
        },
        listing,
        provides: vec![name.to_string()],
        requires: vec!["libc.so.6()(64bit)".to_string(), "rpmlib(CompressedFileNames)".to_string()],
        payload: Vec::new(),
    }
}

/// A source package with one tarball, one patch and a spec file
pub fn source(name: &str, version: &str, release: &str) -> FixturePackage {
    let tarball = format!("{}-{}.tar.gz", name, version);
    let patch = format!("{}-fix.patch", name);
    let spec = format!("{}.spec", name);

    let listing = [&spec, &tarball, &patch]
        .iter()
        .map(|f| format!("-rw-r--r--    1 mockbuild mockbuild   1024 Jan 28  2020 {}\n", f))
        .collect();

    let members = format!(
        "{n}-{v}/\n{n}-{v}/src/main.c\n{n}-{v}/src/util.c\n{n}-{v}/README\n",
        n = name,
        v = version
    );
    let patch_text = format!(
        "--- {n}-{v}/src/util.c.orig\n+++ {n}-{v}/src/util.c\n@@ -1 +1 @@\n-old\n+new\n",
        n = name,
        v = version
    );
    let spec_text = format!(
        "Name: {}\nVersion: {}\nBuildRequires: gcc, make\nBuildRequires: ncurses-devel >= 5.9\n",
        name, version
    );

    FixturePackage {
        header: PackageHeader {
            name: name.to_string(),
            version: version.to_string(),
            release: release.to_string(),
            build_time: "1580212343".to_string(),
            arch: "src".to_string(),
            source_rpm: None,
        },
        listing,
        provides: Vec::new(),
        requires: Vec::new(),
        payload: vec![
            PayloadFile::text(&spec, &spec_text, 0o644),
            PayloadFile::text(&tarball, &members, 0o644),
            PayloadFile::text(&patch, &patch_text, 0o644),
        ],
    }
}

/// [`PackageInspector`] answering from canned package descriptions keyed by file name
pub struct FixtureInspector {
    packages: HashMap<String, FixturePackage>,
    excludes: Vec<String>,
    requires_filter: Vec<String>,
}

impl FixtureInspector {
    pub fn new() -> Self {
        let config = Config::default();
        Self {
            packages: HashMap::new(),
            excludes: config.ingest.file_excludes,
            requires_filter: config.ingest.requires_filter,
        }
    }

    /// Describe the package file called `fullname`
    pub fn with(mut self, fullname: &str, package: FixturePackage) -> Self {
        self.packages.insert(fullname.to_string(), package);
        self
    }

    fn package(&self, path: &Path) -> Result<&FixturePackage> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.packages
            .get(&name)
            .ok_or_else(|| Error::ToolError(format!("rpm: {}: not an rpm package", path.display())))
    }
}

impl PackageInspector for FixtureInspector {
    fn package_header(&self, package: &Path, _kind: PackageKind) -> Result<PackageHeader> {
        Ok(self.package(package)?.header.clone())
    }

    fn list_files(&self, package: &Path) -> Result<Vec<FileListing>> {
        Ok(parse_file_listing(&self.package(package)?.listing, &self.excludes))
    }

    fn dependencies(&self, package: &Path, kind: DependencyKind) -> Result<Vec<String>> {
        let pkg = self.package(package)?;
        Ok(match kind {
            DependencyKind::Provides => parse_dependencies(&pkg.provides.join("\n"), &[]),
            DependencyKind::Requires => {
                parse_dependencies(&pkg.requires.join("\n"), &self.requires_filter)
            }
        })
    }

    fn explode(&self, package: &Path, dest: &Path) -> Result<()> {
        for file in &self.package(package)?.payload {
            let target = dest.join(&file.path);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&target, &file.contents)?;
            fs::set_permissions(&target, fs::Permissions::from_mode(file.mode))?;
        }
        Ok(())
    }

    fn inspect_elf(&self, _file: &Path) -> Result<HardeningFlags> {
        Ok(FIXTURE_FLAGS)
    }

    fn list_symbols(&self, file: &Path) -> Result<Vec<String>> {
        let contents = fs::read(file)?;
        let text = String::from_utf8_lossy(&contents[ELF_MAGIC.len()..]).into_owned();
        Ok(filter_symbols(text.split_whitespace()))
    }

    fn list_tarball(&self, archive: &Path) -> Result<Vec<String>> {
        Ok(parse_tar_listing(&fs::read_to_string(archive)?, &self.excludes))
    }

    fn list_patch_targets(&self, patch: &Path) -> Result<Vec<String>> {
        Ok(parse_patch_targets(&fs::read_to_string(patch)?))
    }

    fn extract_tarball(&self, archive: &Path, dest: &Path) -> Result<()> {
        for member in self.list_tarball(archive)? {
            let target = dest.join(&member);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&target, "int main(void)\n{\n    return 0;\n}\n")?;
            // tar keeps read-only modes from the archive
            fs::set_permissions(&target, fs::Permissions::from_mode(0o444))?;
        }
        Ok(())
    }

    fn ctags(&self, tree: &Path) -> Result<Vec<CtagEntry>> {
        let mut entries: Vec<CtagEntry> = WalkDir::new(tree)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter_map(|e| {
                let relative = e.path().strip_prefix(tree).ok()?;
                Some(CtagEntry {
                    name: "main".to_string(),
                    kind: CtagKind::Function,
                    line: 1,
                    file: relative.to_string_lossy().into_owned(),
                    extra: "int main(void)".to_string(),
                })
            })
            .collect();
        entries.sort_by(|a, b| a.file.cmp(&b.file));
        Ok(entries)
    }
}

/// Write a stand-in package file called `fullname` into `dir`
pub fn write_package_file(dir: &Path, fullname: &str) -> PathBuf {
    let path = dir.join(fullname);
    let mut contents = RPM_MAGIC.to_vec();
    contents.extend([0u8; 92]);
    fs::write(&path, contents).unwrap();
    path
}

/// Create a fresh database in a temporary directory.
///
/// Returns (TempDir, Connection) - keep the TempDir alive to prevent cleanup.
pub fn setup_test_db() -> (TempDir, Connection) {
    let temp_dir = tempfile::tempdir().unwrap();
    let db_path = temp_dir.path().join("rq.db").to_str().unwrap().to_string();
    rq::db::init(&db_path).unwrap();
    let conn = rq::db::open(&db_path).unwrap();
    (temp_dir, conn)
}

/// Row count of `table` for one tag
pub fn count_rows(conn: &Connection, table: &str, tag_id: i64) -> i64 {
    conn.query_row(
        &format!("SELECT COUNT(*) FROM {} WHERE tag_id = ?1", table),
        [tag_id],
        |row| row.get(0),
    )
    .unwrap()
}
