// src/query.rs

//! Read-only catalog queries
//!
//! Every query matches one column against a pattern: a case-insensitive
//! substring by default, or a regular expression through the `REGEXP`
//! function registered on every connection. Results are ordered by tag,
//! then by the matched value.

use crate::db::models::{HardeningFlags, PackageKind};
use crate::error::{Error, Result};
use regex::Regex;
use rusqlite::{Connection, Row, params};
use std::fmt;
use std::str::FromStr;

/// What a query searches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKind {
    Files,
    Provides,
    Requires,
    Symbols,
    Packages,
    Ctags,
    Buildreqs,
}

impl QueryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryKind::Files => "files",
            QueryKind::Provides => "provides",
            QueryKind::Requires => "requires",
            QueryKind::Symbols => "symbols",
            QueryKind::Packages => "packages",
            QueryKind::Ctags => "ctags",
            QueryKind::Buildreqs => "buildreqs",
        }
    }

    /// Whether this kind of record exists in catalogs of `kind`
    pub fn applies_to(&self, kind: PackageKind) -> bool {
        match self {
            QueryKind::Files | QueryKind::Packages => true,
            QueryKind::Provides | QueryKind::Requires | QueryKind::Symbols => {
                kind == PackageKind::Binary
            }
            QueryKind::Ctags | QueryKind::Buildreqs => kind == PackageKind::Source,
        }
    }

    /// SELECT list and FROM clause, with the matched column third.
    ///
    /// Columns: tag, package, matched, detail1, detail2, detail3, file id, build date.
    fn sql(&self, kind: PackageKind) -> (&'static str, &'static str) {
        match (self, kind) {
            (QueryKind::Files, PackageKind::Binary) => (
                "t.name, p.fullname, f.path, u.name, g.name, f.perms, f.id, p.build_date",
                "files f
                 JOIN packages p ON p.id = f.package_id
                 JOIN tags t ON t.id = f.tag_id
                 JOIN users u ON u.id = f.user_id
                 JOIN groups g ON g.id = f.group_id",
            ),
            (QueryKind::Files, PackageKind::Source) => (
                "t.name, p.fullname, sf.path, s.filename, NULL, NULL, NULL, p.build_date",
                "source_files sf
                 JOIN sources s ON s.id = sf.source_id
                 JOIN packages p ON p.id = sf.package_id
                 JOIN tags t ON t.id = sf.tag_id",
            ),
            (QueryKind::Provides, _) => (
                "t.name, p.fullname, c.name, NULL, NULL, NULL, NULL, p.build_date",
                "provides d
                 JOIN capabilities c ON c.id = d.capability_id
                 JOIN packages p ON p.id = d.package_id
                 JOIN tags t ON t.id = d.tag_id",
            ),
            (QueryKind::Requires, _) => (
                "t.name, p.fullname, c.name, NULL, NULL, NULL, NULL, p.build_date",
                "requires d
                 JOIN capabilities c ON c.id = d.capability_id
                 JOIN packages p ON p.id = d.package_id
                 JOIN tags t ON t.id = d.tag_id",
            ),
            (QueryKind::Symbols, _) => (
                "t.name, p.fullname, s.name, f.path, NULL, NULL, f.id, p.build_date",
                "symbols s
                 JOIN files f ON f.id = s.file_id
                 JOIN packages p ON p.id = s.package_id
                 JOIN tags t ON t.id = s.tag_id",
            ),
            (QueryKind::Packages, _) => (
                "t.name, p.fullname, p.name, p.version, p.release, p.arch, NULL, p.build_date",
                "packages p
                 JOIN tags t ON t.id = p.tag_id",
            ),
            (QueryKind::Ctags, _) => (
                "t.name, p.fullname, c.name, c.kind, CAST(c.line AS TEXT), c.file, NULL, p.build_date",
                "ctags c
                 JOIN packages p ON p.id = c.package_id
                 JOIN tags t ON t.id = c.tag_id",
            ),
            (QueryKind::Buildreqs, _) => (
                "t.name, p.fullname, n.name, NULL, NULL, NULL, NULL, p.build_date",
                "buildreqs b
                 JOIN buildreq_names n ON n.id = b.name_id
                 JOIN packages p ON p.id = b.package_id
                 JOIN tags t ON t.id = b.tag_id",
            ),
        }
    }

    fn matched_column(&self, kind: PackageKind) -> &'static str {
        match (self, kind) {
            (QueryKind::Files, PackageKind::Binary) => "f.path",
            (QueryKind::Files, PackageKind::Source) => "sf.path",
            (QueryKind::Provides | QueryKind::Requires, _) => "c.name",
            (QueryKind::Symbols, _) => "s.name",
            (QueryKind::Packages, _) => "p.name",
            (QueryKind::Ctags, _) => "c.name",
            (QueryKind::Buildreqs, _) => "n.name",
        }
    }
}

impl fmt::Display for QueryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QueryKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "files" => Ok(QueryKind::Files),
            "provides" => Ok(QueryKind::Provides),
            "requires" => Ok(QueryKind::Requires),
            "symbols" => Ok(QueryKind::Symbols),
            "packages" => Ok(QueryKind::Packages),
            "ctags" => Ok(QueryKind::Ctags),
            "buildreqs" => Ok(QueryKind::Buildreqs),
            _ => Err(format!("Invalid query kind: {}", s)),
        }
    }
}

/// Options shared by every query
#[derive(Debug, Clone)]
pub struct QueryOptions {
    pub kind: PackageKind,
    pub tag: Option<String>,
    /// Treat the pattern as a regular expression
    pub regexp: bool,
}

impl QueryOptions {
    pub fn new(kind: PackageKind) -> Self {
        Self {
            kind,
            tag: None,
            regexp: false,
        }
    }
}

/// One query hit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryMatch {
    pub tag: String,
    pub package: String,
    pub value: String,
    /// Kind-specific columns: owner/group/mode for files, the source
    /// archive for source files, the file for symbols, version/release/arch
    /// for packages, kind/line/file for ctags
    pub details: Vec<String>,
    pub file_id: Option<i64>,
    pub build_date: String,
}

impl QueryMatch {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let details = (3..6)
            .map(|i| row.get::<_, Option<String>>(i))
            .collect::<rusqlite::Result<Vec<_>>>()?
            .into_iter()
            .flatten()
            .collect();

        Ok(Self {
            tag: row.get(0)?,
            package: row.get(1)?,
            value: row.get(2)?,
            details,
            file_id: row.get(6)?,
            build_date: row.get(7)?,
        })
    }

    /// Hardening flags of the matched ELF file, if it was inspected
    pub fn flags(&self, conn: &Connection) -> Result<Option<HardeningFlags>> {
        match self.file_id {
            Some(id) => HardeningFlags::find_by_file(conn, id),
            None => Ok(None),
        }
    }
}

/// Escape LIKE wildcards and wrap the pattern for a substring match
pub fn like_pattern(pattern: &str) -> String {
    let mut escaped = String::with_capacity(pattern.len() + 2);
    escaped.push('%');
    for c in pattern.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

fn build(kind: QueryKind, pattern: &str, opts: &QueryOptions, count: bool) -> Result<(String, String)> {
    if !kind.applies_to(opts.kind) {
        return Err(Error::ValidationError(format!(
            "{} queries are not available for {} packages",
            kind, opts.kind
        )));
    }

    let column = kind.matched_column(opts.kind);
    let (condition, value) = if opts.regexp {
        Regex::new(pattern)
            .map_err(|e| Error::ValidationError(format!("Invalid regular expression: {}", e)))?;
        (format!("{} REGEXP ?1", column), pattern.to_string())
    } else {
        (format!("{} LIKE ?1 ESCAPE '\\'", column), like_pattern(pattern))
    };

    let (select, from) = kind.sql(opts.kind);
    let select = if count { "COUNT(*)" } else { select };
    let mut sql = format!(
        "SELECT {} FROM {} WHERE {} AND t.kind = ?2 AND (?3 IS NULL OR t.name = ?3)",
        select, from, condition
    );
    if !count {
        sql.push_str(&format!(" ORDER BY t.name, {}, p.fullname", column));
    }
    Ok((sql, value))
}

/// All matches of `pattern` for `kind`
pub fn search(conn: &Connection, kind: QueryKind, pattern: &str, opts: &QueryOptions) -> Result<Vec<QueryMatch>> {
    let (sql, value) = build(kind, pattern, opts, false)?;
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params![value, opts.kind.as_str(), opts.tag], QueryMatch::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Number of matches of `pattern` for `kind`
pub fn count(conn: &Connection, kind: QueryKind, pattern: &str, opts: &QueryOptions) -> Result<i64> {
    let (sql, value) = build(kind, pattern, opts, true)?;
    let n = conn.query_row(&sql, params![value, opts.kind.as_str(), opts.tag], |row| row.get(0))?;
    Ok(n)
}
