// src/db/models/reference.rs

//! Reference tables - interned names for users, groups, capabilities and
//! build requirements

use crate::error::Result;
use rusqlite::{Connection, OptionalExtension};
use std::fmt;

/// The interned-name tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ReferenceKind {
    User,
    Group,
    Capability,
    BuildRequirement,
}

impl ReferenceKind {
    pub fn table(&self) -> &'static str {
        match self {
            ReferenceKind::User => "users",
            ReferenceKind::Group => "groups",
            ReferenceKind::Capability => "capabilities",
            ReferenceKind::BuildRequirement => "buildreq_names",
        }
    }

    /// Id of `name`, if it has been stored
    pub fn find_id(&self, conn: &Connection, name: &str) -> Result<Option<i64>> {
        let id = conn
            .query_row(
                &format!("SELECT id FROM {} WHERE name = ?1", self.table()),
                [name],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id)
    }

    /// Store `name` and return its new id (fails on a duplicate)
    pub fn insert(&self, conn: &Connection, name: &str) -> Result<i64> {
        conn.execute(&format!("INSERT INTO {} (name) VALUES (?1)", self.table()), [name])?;
        Ok(conn.last_insert_rowid())
    }

    /// Name stored under `id`
    pub fn name_of(&self, conn: &Connection, id: i64) -> Result<Option<String>> {
        let name = conn
            .query_row(
                &format!("SELECT name FROM {} WHERE id = ?1", self.table()),
                [id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(name)
    }
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ReferenceKind::User => "user",
            ReferenceKind::Group => "group",
            ReferenceKind::Capability => "capability",
            ReferenceKind::BuildRequirement => "build requirement",
        };
        f.write_str(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::test_support::create_test_db;

    #[test]
    fn test_insert_and_find() {
        let conn = create_test_db();
        let id = ReferenceKind::Capability.insert(&conn, "libc.so.6()(64bit)").unwrap();

        assert_eq!(
            ReferenceKind::Capability.find_id(&conn, "libc.so.6()(64bit)").unwrap(),
            Some(id)
        );
        assert_eq!(ReferenceKind::User.find_id(&conn, "libc.so.6()(64bit)").unwrap(), None);
        assert_eq!(
            ReferenceKind::Capability.name_of(&conn, id).unwrap().as_deref(),
            Some("libc.so.6()(64bit)")
        );
    }

    #[test]
    fn test_duplicate_name_is_constraint_violation() {
        let conn = create_test_db();
        ReferenceKind::Group.insert(&conn, "wheel").unwrap();
        let err = ReferenceKind::Group.insert(&conn, "wheel").unwrap_err();
        assert!(err.is_constraint_violation());
    }
}
