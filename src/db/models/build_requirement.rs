// src/db/models/build_requirement.rs

use super::PackageRef;
use crate::error::Result;
use rusqlite::{Connection, params};

/// A build requirement declared by a source package's spec file
#[derive(Debug, Clone)]
pub struct BuildRequirement {
    pub id: Option<i64>,
    pub tag_id: i64,
    pub package_id: i64,
    pub name_id: i64,
}

impl BuildRequirement {
    pub fn new(package: PackageRef, name_id: i64) -> Self {
        Self {
            id: None,
            tag_id: package.tag_id,
            package_id: package.id,
            name_id,
        }
    }

    pub fn insert(&mut self, conn: &Connection) -> Result<i64> {
        conn.execute(
            "INSERT INTO buildreqs (tag_id, package_id, name_id) VALUES (?1, ?2, ?3)",
            params![self.tag_id, self.package_id, self.name_id],
        )?;

        let id = conn.last_insert_rowid();
        self.id = Some(id);
        Ok(id)
    }

    pub fn names_for_package(conn: &Connection, package_id: i64) -> Result<Vec<String>> {
        let mut stmt = conn.prepare(
            "SELECT n.name FROM buildreqs b JOIN buildreq_names n ON n.id = b.name_id
             WHERE b.package_id = ?1 ORDER BY n.name",
        )?;
        let names = stmt
            .query_map([package_id], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(names)
    }
}
