// src/db/models/already_seen.rs

//! Already-seen ledger
//!
//! Package file names known to be superseded within a tag. Reconciliation
//! skips any scanned file listed here. A file name is never both in the
//! ledger and present as a package of the same tag: inserting a package
//! removes its ledger row, and a ledger row is not added while the package
//! is present.

use crate::error::Result;
use rusqlite::{Connection, OptionalExtension, params};

pub struct AlreadySeen;

impl AlreadySeen {
    /// Record `fullname` as superseded. Returns false when it was not added,
    /// either because it is already listed or because the package is present.
    pub fn insert(conn: &Connection, tag_id: i64, fullname: &str) -> Result<bool> {
        let present = conn
            .query_row(
                "SELECT 1 FROM packages WHERE tag_id = ?1 AND fullname = ?2",
                params![tag_id, fullname],
                |_| Ok(()),
            )
            .optional()?;
        if present.is_some() {
            return Ok(false);
        }

        let inserted = conn.execute(
            "INSERT OR IGNORE INTO already_seen (tag_id, fullname) VALUES (?1, ?2)",
            params![tag_id, fullname],
        )?;
        Ok(inserted > 0)
    }

    pub fn contains(conn: &Connection, tag_id: i64, fullname: &str) -> Result<bool> {
        let found = conn
            .query_row(
                "SELECT 1 FROM already_seen WHERE tag_id = ?1 AND fullname = ?2",
                params![tag_id, fullname],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    pub fn remove(conn: &Connection, tag_id: i64, fullname: &str) -> Result<()> {
        conn.execute(
            "DELETE FROM already_seen WHERE tag_id = ?1 AND fullname = ?2",
            params![tag_id, fullname],
        )?;
        Ok(())
    }

    /// Every ledger entry of a tag, sorted
    pub fn list(conn: &Connection, tag_id: i64) -> Result<Vec<String>> {
        let mut stmt = conn.prepare("SELECT fullname FROM already_seen WHERE tag_id = ?1 ORDER BY fullname")?;
        let names = stmt
            .query_map([tag_id], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(names)
    }
}
