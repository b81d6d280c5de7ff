// src/db/models/source.rs

//! Patches and tarballs shipped inside a source package

use super::{PackageRef, conversion_error};
use crate::error::Result;
use rusqlite::{Connection, Row, params};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Patch,
    Tarball,
}

impl SourceKind {
    pub fn as_str(&self) -> &str {
        match self {
            SourceKind::Patch => "patch",
            SourceKind::Tarball => "tarball",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "patch" => Ok(SourceKind::Patch),
            "tarball" => Ok(SourceKind::Tarball),
            _ => Err(format!("Invalid source kind: {}", s)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SourceEntry {
    pub id: Option<i64>,
    pub tag_id: i64,
    pub package_id: i64,
    pub kind: SourceKind,
    pub filename: String,
}

impl SourceEntry {
    pub fn new(package: PackageRef, kind: SourceKind, filename: String) -> Self {
        Self {
            id: None,
            tag_id: package.tag_id,
            package_id: package.id,
            kind,
            filename,
        }
    }

    pub fn insert(&mut self, conn: &Connection) -> Result<i64> {
        conn.execute(
            "INSERT INTO sources (tag_id, package_id, kind, filename) VALUES (?1, ?2, ?3, ?4)",
            params![self.tag_id, self.package_id, self.kind.as_str(), &self.filename],
        )?;

        let id = conn.last_insert_rowid();
        self.id = Some(id);
        Ok(id)
    }

    /// Sources of a package ordered by file name
    pub fn find_by_package(conn: &Connection, package_id: i64) -> Result<Vec<Self>> {
        let mut stmt = conn.prepare(
            "SELECT id, tag_id, package_id, kind, filename FROM sources
             WHERE package_id = ?1 ORDER BY filename",
        )?;
        let sources = stmt
            .query_map([package_id], Self::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(sources)
    }

    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let kind: String = row.get(3)?;
        Ok(Self {
            id: Some(row.get(0)?),
            tag_id: row.get(1)?,
            package_id: row.get(2)?,
            kind: kind.parse().map_err(|e| conversion_error(3, e))?,
            filename: row.get(4)?,
        })
    }
}
