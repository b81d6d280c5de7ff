// src/db/models/package.rs

//! Package model - one row per ingested package file

use super::AlreadySeen;
use crate::error::Result;
use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::debug;

/// Identity of a stored package, used to file child records under it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PackageRef {
    pub id: i64,
    pub tag_id: i64,
}

/// A package (binary or source) filed under a tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Package {
    pub id: Option<i64>,
    pub tag_id: i64,
    pub name: String,
    pub version: String,
    pub release: String,
    pub build_date: String,
    pub arch: String,
    /// Originating source package; `None` for source packages themselves
    pub source_rpm: Option<String>,
    /// File name the package was loaded from
    pub fullname: String,
    /// Whether the package arrived through reconciliation
    pub is_update: bool,
}

const PACKAGE_COLUMNS: &str =
    "id, tag_id, name, version, release, build_date, arch, source_rpm, fullname, is_update";

/// Child tables keyed by package_id, in deletion order
const CHILD_TABLES: &[&str] = &[
    "flags",
    "symbols",
    "files",
    "provides",
    "requires",
    "ctags",
    "source_files",
    "sources",
    "buildreqs",
];

impl Package {
    pub fn new(
        tag_id: i64,
        name: String,
        version: String,
        release: String,
        arch: String,
        fullname: String,
    ) -> Self {
        Self {
            id: None,
            tag_id,
            name,
            version,
            release,
            build_date: String::new(),
            arch,
            source_rpm: None,
            fullname,
            is_update: false,
        }
    }

    /// `name-version-release`
    pub fn nvr(&self) -> String {
        format!("{}-{}-{}", self.name, self.version, self.release)
    }

    /// The stored identity, once the package has been inserted
    pub fn reference(&self) -> Option<PackageRef> {
        self.id.map(|id| PackageRef { id, tag_id: self.tag_id })
    }

    /// Insert the package and drop any ledger entry for the same file name
    pub fn insert(&mut self, conn: &Connection) -> Result<PackageRef> {
        conn.execute(
            "INSERT INTO packages (tag_id, name, version, release, build_date, arch, source_rpm, fullname, is_update)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                self.tag_id,
                &self.name,
                &self.version,
                &self.release,
                &self.build_date,
                &self.arch,
                &self.source_rpm,
                &self.fullname,
                self.is_update,
            ],
        )?;

        let id = conn.last_insert_rowid();
        self.id = Some(id);
        AlreadySeen::remove(conn, self.tag_id, &self.fullname)?;

        debug!("Inserted package {} as id {}", self.fullname, id);
        Ok(PackageRef { id, tag_id: self.tag_id })
    }

    /// Whether a package with this exact identity is already filed under the tag
    pub fn exists(
        conn: &Connection,
        tag_id: i64,
        name: &str,
        version: &str,
        release: &str,
        arch: &str,
    ) -> Result<bool> {
        let found = conn
            .query_row(
                "SELECT 1 FROM packages
                 WHERE tag_id = ?1 AND name = ?2 AND version = ?3 AND release = ?4 AND arch = ?5",
                params![tag_id, name, version, release, arch],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Find a package by id
    pub fn find_by_id(conn: &Connection, id: i64) -> Result<Option<Self>> {
        let mut stmt = conn.prepare(&format!("SELECT {} FROM packages WHERE id = ?1", PACKAGE_COLUMNS))?;
        let pkg = stmt.query_row([id], Self::from_row).optional()?;
        Ok(pkg)
    }

    /// Find the package loaded from `fullname` in a tag
    pub fn find_by_fullname(conn: &Connection, tag_id: i64, fullname: &str) -> Result<Option<Self>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM packages WHERE tag_id = ?1 AND fullname = ?2",
            PACKAGE_COLUMNS
        ))?;
        let pkg = stmt.query_row(params![tag_id, fullname], Self::from_row).optional()?;
        Ok(pkg)
    }

    /// Packages in a tag with the given base name and architecture
    pub fn find_by_name_arch(conn: &Connection, tag_id: i64, name: &str, arch: &str) -> Result<Vec<Self>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM packages WHERE tag_id = ?1 AND name = ?2 AND arch = ?3 ORDER BY id",
            PACKAGE_COLUMNS
        ))?;
        let pkgs = stmt
            .query_map(params![tag_id, name, arch], Self::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(pkgs)
    }

    /// Packages with the given base name, optionally limited to one tag
    pub fn find_by_name(conn: &Connection, tag_id: Option<i64>, name: &str) -> Result<Vec<Self>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM packages WHERE name = ?1 AND (?2 IS NULL OR tag_id = ?2)
             ORDER BY tag_id, version, release",
            PACKAGE_COLUMNS
        ))?;
        let pkgs = stmt
            .query_map(params![name, tag_id], Self::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(pkgs)
    }

    /// All packages in a tag ordered by name
    pub fn find_by_tag(conn: &Connection, tag_id: i64) -> Result<Vec<Self>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM packages WHERE tag_id = ?1 ORDER BY name, version, release, arch",
            PACKAGE_COLUMNS
        ))?;
        let pkgs = stmt
            .query_map([tag_id], Self::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(pkgs)
    }

    /// Packages in a tag that arrived through reconciliation
    pub fn find_updates(conn: &Connection, tag_id: i64) -> Result<Vec<Self>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM packages WHERE tag_id = ?1 AND is_update = 1 ORDER BY name, version, release",
            PACKAGE_COLUMNS
        ))?;
        let pkgs = stmt
            .query_map([tag_id], Self::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(pkgs)
    }

    /// Delete a package together with every child record filed under it
    pub fn delete(conn: &Connection, id: i64) -> Result<()> {
        for table in CHILD_TABLES {
            conn.execute(&format!("DELETE FROM {} WHERE package_id = ?1", table), [id])?;
        }
        conn.execute("DELETE FROM packages WHERE id = ?1", [id])?;
        debug!("Deleted package {}", id);
        Ok(())
    }

    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: Some(row.get(0)?),
            tag_id: row.get(1)?,
            name: row.get(2)?,
            version: row.get(3)?,
            release: row.get(4)?,
            build_date: row.get(5)?,
            arch: row.get(6)?,
            source_rpm: row.get(7)?,
            fullname: row.get(8)?,
            is_update: row.get(9)?,
        })
    }
}
