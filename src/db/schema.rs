// src/db/schema.rs

//! Database schema definitions and migrations for rq
//!
//! This module defines the SQLite schema for the catalog and provides a
//! migration system to evolve the schema over time.

use crate::error::{Error, Result};
use rusqlite::Connection;
use tracing::{debug, info};

/// Current schema version
pub const SCHEMA_VERSION: i32 = 2;

/// Initialize the schema version tracking table
fn init_schema_version(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;
    Ok(())
}

/// Get the current schema version from the database
pub fn get_schema_version(conn: &Connection) -> Result<i32> {
    init_schema_version(conn)?;

    let version = conn
        .query_row(
            "SELECT version FROM schema_version ORDER BY version DESC LIMIT 1",
            [],
            |row| row.get(0),
        )
        .unwrap_or(0);

    Ok(version)
}

/// Set the schema version
fn set_schema_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute(
        "INSERT INTO schema_version (version) VALUES (?1)",
        [version],
    )?;
    Ok(())
}

/// Apply all pending migrations to bring the database up to date
pub fn migrate(conn: &Connection) -> Result<()> {
    let current_version = get_schema_version(conn)?;
    debug!("Current schema version: {}", current_version);

    if current_version >= SCHEMA_VERSION {
        return Ok(());
    }

    for version in (current_version + 1)..=SCHEMA_VERSION {
        info!("Applying migration to version {}", version);
        apply_migration(conn, version)?;
        set_schema_version(conn, version)?;
    }

    info!("Schema migration complete. Now at version {}", SCHEMA_VERSION);
    Ok(())
}

/// Apply a specific migration version
fn apply_migration(conn: &Connection, version: i32) -> Result<()> {
    match version {
        1 => migrate_v1(conn),
        2 => migrate_v2(conn),
        _ => Err(Error::DatabaseError(rusqlite::Error::InvalidQuery)),
    }
}

/// Initial schema - Version 1
///
/// Tags, packages and the reference tables, plus the binary-package
/// children (files, provides, requires, symbols, flags).
fn migrate_v1(conn: &Connection) -> Result<()> {
    debug!("Creating schema version 1");

    conn.execute_batch(
        "
        -- Tags: a named snapshot directory of packages
        CREATE TABLE tags (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            kind TEXT NOT NULL CHECK(kind IN ('binary', 'source')),
            name TEXT NOT NULL,
            path TEXT NOT NULL,
            update_path TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT,
            UNIQUE(kind, name)
        );

        -- Packages: one row per ingested package file
        CREATE TABLE packages (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            tag_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            version TEXT NOT NULL,
            release TEXT NOT NULL,
            build_date TEXT NOT NULL,
            arch TEXT NOT NULL,
            source_rpm TEXT,
            fullname TEXT NOT NULL,
            is_update INTEGER NOT NULL DEFAULT 0,
            UNIQUE(tag_id, name, version, release, arch),
            FOREIGN KEY (tag_id) REFERENCES tags(id) ON DELETE CASCADE
        );

        CREATE INDEX idx_packages_tag_fullname ON packages(tag_id, fullname);
        CREATE INDEX idx_packages_name ON packages(name);

        -- Reference tables: name -> stable id
        CREATE TABLE users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE
        );

        CREATE TABLE groups (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE
        );

        CREATE TABLE capabilities (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE
        );

        -- Files: binary package contents
        CREATE TABLE files (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            tag_id INTEGER NOT NULL,
            package_id INTEGER NOT NULL,
            path TEXT NOT NULL,
            user_id INTEGER NOT NULL,
            group_id INTEGER NOT NULL,
            perms TEXT NOT NULL,
            is_suid INTEGER NOT NULL DEFAULT 0,
            is_sgid INTEGER NOT NULL DEFAULT 0,
            FOREIGN KEY (tag_id) REFERENCES tags(id) ON DELETE CASCADE,
            FOREIGN KEY (package_id) REFERENCES packages(id) ON DELETE CASCADE,
            FOREIGN KEY (user_id) REFERENCES users(id),
            FOREIGN KEY (group_id) REFERENCES groups(id)
        );

        CREATE INDEX idx_files_package ON files(package_id, path);
        CREATE INDEX idx_files_tag ON files(tag_id);

        -- Provides / Requires: capability associations (not deduplicated)
        CREATE TABLE provides (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            tag_id INTEGER NOT NULL,
            package_id INTEGER NOT NULL,
            capability_id INTEGER NOT NULL,
            FOREIGN KEY (tag_id) REFERENCES tags(id) ON DELETE CASCADE,
            FOREIGN KEY (package_id) REFERENCES packages(id) ON DELETE CASCADE,
            FOREIGN KEY (capability_id) REFERENCES capabilities(id)
        );

        CREATE INDEX idx_provides_package ON provides(package_id);

        CREATE TABLE requires (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            tag_id INTEGER NOT NULL,
            package_id INTEGER NOT NULL,
            capability_id INTEGER NOT NULL,
            FOREIGN KEY (tag_id) REFERENCES tags(id) ON DELETE CASCADE,
            FOREIGN KEY (package_id) REFERENCES packages(id) ON DELETE CASCADE,
            FOREIGN KEY (capability_id) REFERENCES capabilities(id)
        );

        CREATE INDEX idx_requires_package ON requires(package_id);

        -- Symbols: exported dynamic symbols of ELF files
        CREATE TABLE symbols (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            tag_id INTEGER NOT NULL,
            package_id INTEGER NOT NULL,
            file_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            FOREIGN KEY (tag_id) REFERENCES tags(id) ON DELETE CASCADE,
            FOREIGN KEY (package_id) REFERENCES packages(id) ON DELETE CASCADE,
            FOREIGN KEY (file_id) REFERENCES files(id) ON DELETE CASCADE
        );

        CREATE INDEX idx_symbols_name ON symbols(name);
        CREATE INDEX idx_symbols_package ON symbols(package_id);

        -- Flags: hardening posture of ELF files
        CREATE TABLE flags (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            tag_id INTEGER NOT NULL,
            package_id INTEGER NOT NULL,
            file_id INTEGER NOT NULL,
            relro TEXT NOT NULL CHECK(relro IN ('none', 'partial', 'full')),
            ssp TEXT NOT NULL CHECK(ssp IN ('not found', 'found')),
            pie TEXT NOT NULL CHECK(pie IN ('none', 'enabled', 'DSO')),
            fortify TEXT NOT NULL CHECK(fortify IN ('not found', 'found')),
            nx TEXT NOT NULL CHECK(nx IN ('disabled', 'enabled')),
            FOREIGN KEY (tag_id) REFERENCES tags(id) ON DELETE CASCADE,
            FOREIGN KEY (package_id) REFERENCES packages(id) ON DELETE CASCADE,
            FOREIGN KEY (file_id) REFERENCES files(id) ON DELETE CASCADE
        );

        CREATE INDEX idx_flags_file ON flags(file_id);
        CREATE INDEX idx_flags_package ON flags(package_id);

        -- Already-seen ledger: superseded package files per tag
        CREATE TABLE already_seen (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            tag_id INTEGER NOT NULL,
            fullname TEXT NOT NULL,
            UNIQUE(tag_id, fullname),
            FOREIGN KEY (tag_id) REFERENCES tags(id) ON DELETE CASCADE
        );
        ",
    )?;

    info!("Schema version 1 created successfully");
    Ok(())
}

/// Version 2: source-package children
fn migrate_v2(conn: &Connection) -> Result<()> {
    debug!("Creating schema version 2");

    conn.execute_batch(
        "
        CREATE TABLE buildreq_names (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE
        );

        -- Sources: patches and tarballs shipped in a source package
        CREATE TABLE sources (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            tag_id INTEGER NOT NULL,
            package_id INTEGER NOT NULL,
            kind TEXT NOT NULL CHECK(kind IN ('patch', 'tarball')),
            filename TEXT NOT NULL,
            FOREIGN KEY (tag_id) REFERENCES tags(id) ON DELETE CASCADE,
            FOREIGN KEY (package_id) REFERENCES packages(id) ON DELETE CASCADE
        );

        CREATE INDEX idx_sources_package ON sources(package_id, filename);

        -- Source files: members of a tarball, or files touched by a patch
        CREATE TABLE source_files (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            tag_id INTEGER NOT NULL,
            package_id INTEGER NOT NULL,
            source_id INTEGER NOT NULL,
            path TEXT NOT NULL,
            FOREIGN KEY (tag_id) REFERENCES tags(id) ON DELETE CASCADE,
            FOREIGN KEY (package_id) REFERENCES packages(id) ON DELETE CASCADE,
            FOREIGN KEY (source_id) REFERENCES sources(id) ON DELETE CASCADE
        );

        CREATE INDEX idx_source_files_package ON source_files(package_id);
        CREATE INDEX idx_source_files_tag ON source_files(tag_id);

        CREATE TABLE buildreqs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            tag_id INTEGER NOT NULL,
            package_id INTEGER NOT NULL,
            name_id INTEGER NOT NULL,
            FOREIGN KEY (tag_id) REFERENCES tags(id) ON DELETE CASCADE,
            FOREIGN KEY (package_id) REFERENCES packages(id) ON DELETE CASCADE,
            FOREIGN KEY (name_id) REFERENCES buildreq_names(id)
        );

        CREATE INDEX idx_buildreqs_package ON buildreqs(package_id);

        CREATE TABLE ctags (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            tag_id INTEGER NOT NULL,
            package_id INTEGER NOT NULL,
            source_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            kind TEXT NOT NULL,
            line INTEGER NOT NULL,
            file TEXT NOT NULL,
            extra TEXT NOT NULL,
            FOREIGN KEY (tag_id) REFERENCES tags(id) ON DELETE CASCADE,
            FOREIGN KEY (package_id) REFERENCES packages(id) ON DELETE CASCADE,
            FOREIGN KEY (source_id) REFERENCES sources(id) ON DELETE CASCADE
        );

        CREATE INDEX idx_ctags_name ON ctags(name);
        CREATE INDEX idx_ctags_package ON ctags(package_id);
        ",
    )?;

    info!("Schema version 2 created successfully");
    Ok(())
}
