// src/db/models/tag.rs

//! Tag model - named snapshot directories of packages

use super::{PackageKind, conversion_error};
use crate::error::{Error, Result};
use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::{debug, info};

/// A tag groups the packages loaded from one directory tree
#[derive(Debug, Clone)]
pub struct Tag {
    pub id: i64,
    pub kind: PackageKind,
    pub name: String,
    pub path: String,
    pub update_path: Option<String>,
    pub created_at: String,
    pub updated_at: Option<String>,
}

/// A tag with its package counts, as shown by `rq tags`
#[derive(Debug, Clone)]
pub struct TagSummary {
    pub tag: Tag,
    pub package_count: i64,
    pub update_count: i64,
}

/// Record counts for one tag (or every tag of a kind)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagStats {
    pub tags: i64,
    pub packages: i64,
    pub files: i64,
    pub provides: i64,
    pub requires: i64,
    pub symbols: i64,
    pub flags: i64,
    pub sources: i64,
    pub source_files: i64,
    pub ctags: i64,
    pub buildreqs: i64,
    pub already_seen: i64,
}

const TAG_COLUMNS: &str = "id, kind, name, path, update_path, created_at, updated_at";

/// Child tables in the order they must be emptied before `packages`
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

impl Tag {
    /// Create a tag; fails with `AlreadyExists` when the name is taken for this kind
    pub fn create(
        conn: &Connection,
        kind: PackageKind,
        name: &str,
        path: &str,
        update_path: Option<&str>,
    ) -> Result<Self> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::ValidationError("Tag name must not be empty".to_string()));
        }

        if Self::find_by_name(conn, kind, name)?.is_some() {
            return Err(Error::AlreadyExists(format!("Tag '{}'", name)));
        }

        let created_at = timestamp();
        let update_path = update_path.map(str::trim).filter(|p| !p.is_empty());
        conn.execute(
            "INSERT INTO tags (kind, name, path, update_path, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![kind.as_str(), name, path.trim(), update_path, &created_at],
        )?;

        let id = conn.last_insert_rowid();
        info!("Created {} tag '{}' (id {})", kind, name, id);

        Ok(Self {
            id,
            kind,
            name: name.to_string(),
            path: path.trim().to_string(),
            update_path: update_path.map(str::to_string),
            created_at,
            updated_at: None,
        })
    }

    /// Look a tag up by name
    pub fn find_by_name(conn: &Connection, kind: PackageKind, name: &str) -> Result<Option<Self>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM tags WHERE kind = ?1 AND name = ?2",
            TAG_COLUMNS
        ))?;
        let tag = stmt
            .query_row(params![kind.as_str(), name], Self::from_row)
            .optional()?;
        Ok(tag)
    }

    /// Look a tag up by name, failing with `NotFoundError` if it does not exist
    pub fn lookup(conn: &Connection, kind: PackageKind, name: &str) -> Result<Self> {
        Self::find_by_name(conn, kind, name)?
            .ok_or_else(|| Error::NotFoundError(format!("Tag '{}' is not a known {} tag", name, kind)))
    }

    /// Find a tag by id
    pub fn find_by_id(conn: &Connection, id: i64) -> Result<Option<Self>> {
        let mut stmt = conn.prepare(&format!("SELECT {} FROM tags WHERE id = ?1", TAG_COLUMNS))?;
        let tag = stmt.query_row([id], Self::from_row).optional()?;
        Ok(tag)
    }

    /// All tags of a kind ordered by name, with package and update counts
    pub fn list(conn: &Connection, kind: PackageKind) -> Result<Vec<TagSummary>> {
        let mut stmt = conn.prepare(
            "SELECT t.id, t.kind, t.name, t.path, t.update_path, t.created_at, t.updated_at,
                    COUNT(p.id), COALESCE(SUM(p.is_update), 0)
             FROM tags t LEFT JOIN packages p ON p.tag_id = t.id
             WHERE t.kind = ?1
             GROUP BY t.id
             ORDER BY t.name",
        )?;

        let tags = stmt
            .query_map([kind.as_str()], |row| {
                Ok(TagSummary {
                    tag: Self::from_row(row)?,
                    package_count: row.get(7)?,
                    update_count: row.get(8)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(tags)
    }

    /// The directory reconciliation scans: the update path if set, else the tag path
    pub fn scan_path(&self) -> &str {
        self.update_path.as_deref().unwrap_or(&self.path)
    }

    /// Record that the tag was reconciled now
    pub fn touch_updated(&mut self, conn: &Connection) -> Result<()> {
        let now = timestamp();
        conn.execute("UPDATE tags SET updated_at = ?1 WHERE id = ?2", params![&now, self.id])?;
        self.updated_at = Some(now);
        Ok(())
    }

    /// Number of packages currently filed under this tag
    pub fn package_count(&self, conn: &Connection) -> Result<i64> {
        let count = conn.query_row(
            "SELECT COUNT(*) FROM packages WHERE tag_id = ?1",
            [self.id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Delete a tag and everything filed under it.
    ///
    /// Child tables are emptied explicitly before packages so no orphaned
    /// rows survive even on a connection without foreign key enforcement.
    /// Returns the number of packages removed.
    pub fn delete(conn: &Connection, tag_id: i64) -> Result<usize> {
        for table in CHILD_TABLES {
            let removed = conn.execute(&format!("DELETE FROM {} WHERE tag_id = ?1", table), [tag_id])?;
            debug!("Removed {} rows from {} for tag {}", removed, table, tag_id);
        }
        conn.execute("DELETE FROM already_seen WHERE tag_id = ?1", [tag_id])?;
        let packages = conn.execute("DELETE FROM packages WHERE tag_id = ?1", [tag_id])?;
        conn.execute("DELETE FROM tags WHERE id = ?1", [tag_id])?;
        info!("Deleted tag {} and {} packages", tag_id, packages);
        Ok(packages)
    }

    /// Record counts for one tag, or for every tag of `kind` when `tag_id` is `None`
    pub fn stats(conn: &Connection, kind: PackageKind, tag_id: Option<i64>) -> Result<TagStats> {
        let count = |table: &str| -> Result<i64> {
            let sql = match tag_id {
                Some(_) => format!(
                    "SELECT COUNT(*) FROM {} c JOIN tags t ON t.id = c.tag_id WHERE t.kind = ?1 AND t.id = ?2",
                    table
                ),
                None => format!(
                    "SELECT COUNT(*) FROM {} c JOIN tags t ON t.id = c.tag_id WHERE t.kind = ?1 AND ?2 IS NULL",
                    table
                ),
            };
            Ok(conn.query_row(&sql, params![kind.as_str(), tag_id], |row| row.get(0))?)
        };

        let tags = match tag_id {
            Some(id) => conn.query_row(
                "SELECT COUNT(*) FROM tags WHERE kind = ?1 AND id = ?2",
                params![kind.as_str(), id],
                |row| row.get(0),
            )?,
            None => conn.query_row(
                "SELECT COUNT(*) FROM tags WHERE kind = ?1",
                [kind.as_str()],
                |row| row.get(0),
            )?,
        };

        Ok(TagStats {
            tags,
            packages: count("packages")?,
            files: count("files")?,
            provides: count("provides")?,
            requires: count("requires")?,
            symbols: count("symbols")?,
            flags: count("flags")?,
            sources: count("sources")?,
            source_files: count("source_files")?,
            ctags: count("ctags")?,
            buildreqs: count("buildreqs")?,
            already_seen: count("already_seen")?,
        })
    }

    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let kind_str: String = row.get(1)?;
        let kind = kind_str
            .parse::<PackageKind>()
            .map_err(|e| conversion_error(1, e))?;

        Ok(Self {
            id: row.get(0)?,
            kind,
            name: row.get(2)?,
            path: row.get(3)?,
            update_path: row.get(4)?,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
        })
    }
}

fn timestamp() -> String {
    chrono::Local::now().format("%a %b %d %H:%M:%S %Y").to_string()
}
