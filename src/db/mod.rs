// src/db/mod.rs

//! SQLite storage for the rq catalog
//!
//! One database file holds both binary and source catalogs; tags are
//! scoped by [`models::PackageKind`]. Model structs in [`models`] provide
//! the insert/find/count/delete operations used by ingestion and
//! reconciliation.

pub mod models;
pub mod schema;

use crate::error::{Error, Result};
use regex::Regex;
use rusqlite::functions::FunctionFlags;
use rusqlite::{Connection, Transaction};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Create the database file (and its directory) and apply the schema
pub fn init(db_path: &str) -> Result<()> {
    if let Some(parent) = Path::new(db_path).parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }

    info!("Initializing database at {}", db_path);
    let conn = Connection::open(db_path)?;
    configure(&conn)?;
    schema::migrate(&conn)?;
    Ok(())
}

/// Open an existing database, enabling foreign keys and the REGEXP function
pub fn open(db_path: &str) -> Result<Connection> {
    if !Path::new(db_path).exists() {
        return Err(Error::NotFoundError(format!(
            "Database {} does not exist (run 'rq init' first)",
            db_path
        )));
    }

    debug!("Opening database {}", db_path);
    let conn = Connection::open(db_path)?;
    configure(&conn)?;
    schema::migrate(&conn)?;
    Ok(conn)
}

/// Open an in-memory database with the full schema (used by tests and dry runs)
pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    configure(&conn)?;
    schema::migrate(&conn)?;
    Ok(conn)
}

/// Run `f` inside a transaction, committing only when it returns `Ok`
pub fn transaction<F, T>(conn: &mut Connection, f: F) -> Result<T>
where
    F: FnOnce(&Transaction) -> Result<T>,
{
    let tx = conn.transaction()?;
    let value = f(&tx)?;
    tx.commit()?;
    Ok(value)
}

fn configure(conn: &Connection) -> Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON; PRAGMA journal_mode = WAL;")?;
    register_regexp(conn)?;
    Ok(())
}

/// Register `REGEXP` so that `col REGEXP ?` works in queries
fn register_regexp(conn: &Connection) -> Result<()> {
    conn.create_scalar_function(
        "regexp",
        2,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let re: Arc<Regex> = ctx.get_or_create_aux(0, |vr| -> std::result::Result<_, BoxError> {
                Ok(Regex::new(vr.as_str()?)?)
            })?;
            let text = ctx
                .get_raw(1)
                .as_str()
                .map_err(|e| rusqlite::Error::UserFunctionError(e.into()))?;
            Ok(re.is_match(text))
        },
    )?;
    Ok(())
}

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_and_open() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("nested/rq.db");
        let db_path = db_path.to_str().unwrap();

        init(db_path).unwrap();
        let conn = open(db_path).unwrap();
        let fk: i64 = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(fk, 1);
    }

    #[test]
    fn test_open_missing_database() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("missing.db");
        let result = open(db_path.to_str().unwrap());
        assert!(matches!(result, Err(Error::NotFoundError(_))));
    }

    #[test]
    fn test_regexp_function() {
        let conn = open_in_memory().unwrap();
        let matched: bool = conn
            .query_row("SELECT '/usr/bin/bash' REGEXP '^/usr/.*sh$'", [], |row| row.get(0))
            .unwrap();
        assert!(matched);

        let matched: bool = conn
            .query_row("SELECT '/usr/bin/bash' REGEXP '^/etc'", [], |row| row.get(0))
            .unwrap();
        assert!(!matched);
    }

    #[test]
    fn test_transaction_rolls_back_on_error() {
        let mut conn = open_in_memory().unwrap();
        let result: Result<()> = transaction(&mut conn, |tx| {
            tx.execute("INSERT INTO users (name) VALUES ('root')", [])?;
            Err(Error::ValidationError("abort".to_string()))
        });
        assert!(result.is_err());

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }
}
