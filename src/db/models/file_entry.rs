// src/db/models/file_entry.rs

//! File models - binary package contents and source-archive members

use super::PackageRef;
use crate::error::Result;
use rusqlite::{Connection, OptionalExtension, params};

/// A file shipped by a binary package
#[derive(Debug, Clone)]
pub struct FileEntry {
    pub id: Option<i64>,
    pub tag_id: i64,
    pub package_id: i64,
    pub path: String,
    pub user_id: i64,
    pub group_id: i64,
    /// Four-digit octal permission string, e.g. `"4755"`
    pub perms: String,
    pub is_suid: bool,
    pub is_sgid: bool,
}

impl FileEntry {
    /// Create a new file entry; the set-id bits are derived from `perms`
    pub fn new(package: PackageRef, path: String, user_id: i64, group_id: i64, perms: String) -> Self {
        let special = perms
            .chars()
            .next()
            .and_then(|c| c.to_digit(8))
            .unwrap_or(0);
        Self {
            id: None,
            tag_id: package.tag_id,
            package_id: package.id,
            path,
            user_id,
            group_id,
            perms,
            is_suid: special & 0o4 != 0,
            is_sgid: special & 0o2 != 0,
        }
    }

    pub fn insert(&mut self, conn: &Connection) -> Result<i64> {
        conn.execute(
            "INSERT INTO files (tag_id, package_id, path, user_id, group_id, perms, is_suid, is_sgid)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                self.tag_id,
                self.package_id,
                &self.path,
                self.user_id,
                self.group_id,
                &self.perms,
                self.is_suid,
                self.is_sgid,
            ],
        )?;

        let id = conn.last_insert_rowid();
        self.id = Some(id);
        Ok(id)
    }

    /// Id of the file recorded at `path` for a package
    pub fn find_id_by_path(conn: &Connection, package_id: i64, path: &str) -> Result<Option<i64>> {
        let id = conn
            .query_row(
                "SELECT id FROM files WHERE package_id = ?1 AND path = ?2 ORDER BY id LIMIT 1",
                params![package_id, path],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id)
    }

    /// Number of files recorded for a package
    pub fn count_for_package(conn: &Connection, package_id: i64) -> Result<i64> {
        let count = conn.query_row(
            "SELECT COUNT(*) FROM files WHERE package_id = ?1",
            [package_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

/// A setuid or setgid file, with its owner names resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SxidFile {
    pub package: String,
    pub path: String,
    pub perms: String,
    pub user: String,
    pub group: String,
    pub is_suid: bool,
    pub is_sgid: bool,
}

impl SxidFile {
    /// All setuid/setgid files in a tag ordered by path
    pub fn find_by_tag(conn: &Connection, tag_id: i64) -> Result<Vec<Self>> {
        let mut stmt = conn.prepare(
            "SELECT p.fullname, f.path, f.perms, u.name, g.name, f.is_suid, f.is_sgid
             FROM files f
             JOIN packages p ON p.id = f.package_id
             JOIN users u ON u.id = f.user_id
             JOIN groups g ON g.id = f.group_id
             WHERE f.tag_id = ?1 AND (f.is_suid = 1 OR f.is_sgid = 1)
             ORDER BY f.path, p.fullname",
        )?;

        let files = stmt
            .query_map([tag_id], |row| {
                Ok(Self {
                    package: row.get(0)?,
                    path: row.get(1)?,
                    perms: row.get(2)?,
                    user: row.get(3)?,
                    group: row.get(4)?,
                    is_suid: row.get(5)?,
                    is_sgid: row.get(6)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(files)
    }
}

/// A file inside a source archive, or a file touched by a patch
#[derive(Debug, Clone)]
pub struct SourceFileEntry {
    pub id: Option<i64>,
    pub tag_id: i64,
    pub package_id: i64,
    pub source_id: i64,
    pub path: String,
}

impl SourceFileEntry {
    pub fn new(package: PackageRef, source_id: i64, path: String) -> Self {
        Self {
            id: None,
            tag_id: package.tag_id,
            package_id: package.id,
            source_id,
            path,
        }
    }

    pub fn insert(&mut self, conn: &Connection) -> Result<i64> {
        conn.execute(
            "INSERT INTO source_files (tag_id, package_id, source_id, path) VALUES (?1, ?2, ?3, ?4)",
            params![self.tag_id, self.package_id, self.source_id, &self.path],
        )?;

        let id = conn.last_insert_rowid();
        self.id = Some(id);
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::test_support::*;
    use crate::db::models::{PackageKind, ReferenceKind, SourceEntry, SourceKind};

    #[test]
    fn test_setid_bits_from_perms() {
        let pref = PackageRef { id: 1, tag_id: 1 };
        let suid = FileEntry::new(pref, "/usr/bin/passwd".into(), 1, 1, "4755".into());
        assert!(suid.is_suid && !suid.is_sgid);

        let sgid = FileEntry::new(pref, "/usr/bin/write".into(), 1, 1, "2755".into());
        assert!(!sgid.is_suid && sgid.is_sgid);

        let both = FileEntry::new(pref, "/usr/bin/x".into(), 1, 1, "6755".into());
        assert!(both.is_suid && both.is_sgid);

        let plain = FileEntry::new(pref, "/usr/bin/ls".into(), 1, 1, "0755".into());
        assert!(!plain.is_suid && !plain.is_sgid);
    }

    #[test]
    fn test_find_setid_files() {
        let conn = create_test_db();
        let tag = create_tag(&conn, PackageKind::Binary, "f32");
        let pref = create_package(&conn, &tag, "shadow-utils", "4.8");
        let root = ReferenceKind::User.insert(&conn, "root").unwrap();
        let tty = ReferenceKind::Group.insert(&conn, "tty").unwrap();

        FileEntry::new(pref, "/usr/bin/passwd".into(), root, tty, "4755".into())
            .insert(&conn)
            .unwrap();
        FileEntry::new(pref, "/usr/bin/chage".into(), root, tty, "0755".into())
            .insert(&conn)
            .unwrap();

        let found = SxidFile::find_by_tag(&conn, tag.id).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].path, "/usr/bin/passwd");
        assert_eq!(found[0].user, "root");
        assert_eq!(found[0].group, "tty");

        assert_eq!(FileEntry::count_for_package(&conn, pref.id).unwrap(), 2);
        assert!(FileEntry::find_id_by_path(&conn, pref.id, "/usr/bin/chage").unwrap().is_some());
        assert!(FileEntry::find_id_by_path(&conn, pref.id, "/usr/bin/nope").unwrap().is_none());
    }

    #[test]
    fn test_source_file_insert() {
        let conn = create_test_db();
        let tag = create_tag(&conn, PackageKind::Source, "f32");
        let pref = create_package(&conn, &tag, "bash", "5.0");
        let source_id = SourceEntry::new(pref, SourceKind::Tarball, "bash-5.0.tar.gz".into())
            .insert(&conn)
            .unwrap();

        let mut file = SourceFileEntry::new(pref, source_id, "bash-5.0/shell.c".into());
        file.insert(&conn).unwrap();
        assert_eq!(file.tag_id, tag.id);
        assert!(file.id.is_some());
    }
}
