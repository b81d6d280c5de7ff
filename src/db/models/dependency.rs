// src/db/models/dependency.rs

//! Provides and requires associations between packages and capabilities

use super::PackageRef;
use crate::error::Result;
use rusqlite::{Connection, params};
use std::fmt;

/// Direction of a capability association
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DependencyKind {
    Provides,
    Requires,
}

impl DependencyKind {
    pub fn table(&self) -> &'static str {
        match self {
            DependencyKind::Provides => "provides",
            DependencyKind::Requires => "requires",
        }
    }
}

impl fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table())
    }
}

/// One provides/requires row; duplicates are kept as the package lists them
#[derive(Debug, Clone)]
pub struct DependencyEntry {
    pub id: Option<i64>,
    pub tag_id: i64,
    pub package_id: i64,
    pub kind: DependencyKind,
    pub capability_id: i64,
}

impl DependencyEntry {
    pub fn new(package: PackageRef, kind: DependencyKind, capability_id: i64) -> Self {
        Self {
            id: None,
            tag_id: package.tag_id,
            package_id: package.id,
            kind,
            capability_id,
        }
    }

    pub fn insert(&mut self, conn: &Connection) -> Result<i64> {
        conn.execute(
            &format!(
                "INSERT INTO {} (tag_id, package_id, capability_id) VALUES (?1, ?2, ?3)",
                self.kind.table()
            ),
            params![self.tag_id, self.package_id, self.capability_id],
        )?;

        let id = conn.last_insert_rowid();
        self.id = Some(id);
        Ok(id)
    }

    /// Capability names associated with a package, in insertion order
    pub fn names_for_package(conn: &Connection, kind: DependencyKind, package_id: i64) -> Result<Vec<String>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT c.name FROM {} d JOIN capabilities c ON c.id = d.capability_id
             WHERE d.package_id = ?1 ORDER BY d.id",
            kind.table()
        ))?;
        let names = stmt
            .query_map([package_id], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::test_support::*;
    use crate::db::models::{PackageKind, ReferenceKind};

    #[test]
    fn test_duplicates_are_kept() {
        let conn = create_test_db();
        let tag = create_tag(&conn, PackageKind::Binary, "f32");
        let pref = create_package(&conn, &tag, "bash", "5.0");
        let cap = ReferenceKind::Capability.insert(&conn, "libc.so.6").unwrap();

        DependencyEntry::new(pref, DependencyKind::Requires, cap).insert(&conn).unwrap();
        DependencyEntry::new(pref, DependencyKind::Requires, cap).insert(&conn).unwrap();

        let names = DependencyEntry::names_for_package(&conn, DependencyKind::Requires, pref.id).unwrap();
        assert_eq!(names, vec!["libc.so.6", "libc.so.6"]);
        assert!(
            DependencyEntry::names_for_package(&conn, DependencyKind::Provides, pref.id)
                .unwrap()
                .is_empty()
        );
    }
}
