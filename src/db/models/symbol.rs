// src/db/models/symbol.rs

use super::PackageRef;
use crate::error::Result;
use rusqlite::{Connection, params};

/// An exported dynamic symbol of an ELF file
#[derive(Debug, Clone)]
pub struct SymbolEntry {
    pub id: Option<i64>,
    pub tag_id: i64,
    pub package_id: i64,
    pub file_id: i64,
    pub name: String,
}

impl SymbolEntry {
    pub fn new(package: PackageRef, file_id: i64, name: String) -> Self {
        Self {
            id: None,
            tag_id: package.tag_id,
            package_id: package.id,
            file_id,
            name,
        }
    }

    pub fn insert(&mut self, conn: &Connection) -> Result<i64> {
        conn.execute(
            "INSERT INTO symbols (tag_id, package_id, file_id, name) VALUES (?1, ?2, ?3, ?4)",
            params![self.tag_id, self.package_id, self.file_id, &self.name],
        )?;

        let id = conn.last_insert_rowid();
        self.id = Some(id);
        Ok(id)
    }

    pub fn count_for_package(conn: &Connection, package_id: i64) -> Result<i64> {
        let count = conn.query_row(
            "SELECT COUNT(*) FROM symbols WHERE package_id = ?1",
            [package_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}
