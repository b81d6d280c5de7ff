// src/db/models/ctag.rs

//! Code symbols indexed from source archives with ctags

use super::PackageRef;
use crate::error::Result;
use rusqlite::{Connection, params};
use std::fmt;
use std::str::FromStr;

/// The ctags symbol kinds rq can keep
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CtagKind {
    Function,
    Subroutine,
    Class,
    Method,
    Macro,
}

impl CtagKind {
    /// Kinds kept when the configuration does not say otherwise
    pub const DEFAULT: [CtagKind; 4] = [
        CtagKind::Function,
        CtagKind::Subroutine,
        CtagKind::Class,
        CtagKind::Method,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CtagKind::Function => "function",
            CtagKind::Subroutine => "subroutine",
            CtagKind::Class => "class",
            CtagKind::Method => "method",
            CtagKind::Macro => "macro",
        }
    }
}

impl fmt::Display for CtagKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CtagKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "function" => Ok(CtagKind::Function),
            "subroutine" => Ok(CtagKind::Subroutine),
            "class" => Ok(CtagKind::Class),
            "method" => Ok(CtagKind::Method),
            "macro" => Ok(CtagKind::Macro),
            _ => Err(format!("Unsupported ctags kind: {}", s)),
        }
    }
}

/// One ctags cross-reference line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CtagEntry {
    pub name: String,
    pub kind: CtagKind,
    pub line: i64,
    pub file: String,
    pub extra: String,
}

impl CtagEntry {
    /// Store the entry under the source archive it was indexed from
    pub fn insert(&self, conn: &Connection, package: PackageRef, source_id: i64) -> Result<i64> {
        conn.execute(
            "INSERT INTO ctags (tag_id, package_id, source_id, name, kind, line, file, extra)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                package.tag_id,
                package.id,
                source_id,
                &self.name,
                self.kind.as_str(),
                self.line,
                &self.file,
                &self.extra,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }
}
