// src/cache.rs

//! Per-run cache of reference ids
//!
//! Users, groups, capability names and build requirement names are interned
//! in their own tables. During a batch load the same names recur thousands
//! of times, so [`ReferenceCache`] remembers every id it has resolved. The
//! cache lives for one ingestion run only; the `UNIQUE(name)` constraint on
//! each table arbitrates between concurrent runs.

use crate::db::models::ReferenceKind;
use crate::error::Result;
use rusqlite::Connection;
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Default)]
pub struct ReferenceCache {
    ids: HashMap<ReferenceKind, HashMap<String, i64>>,
    store_lookups: usize,
}

impl ReferenceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id for `name`, creating the row on first sighting
    pub fn resolve(&mut self, conn: &Connection, kind: ReferenceKind, name: &str) -> Result<i64> {
        if let Some(id) = self.ids.get(&kind).and_then(|names| names.get(name)) {
            return Ok(*id);
        }

        self.store_lookups += 1;
        let id = match kind.find_id(conn, name)? {
            Some(id) => id,
            None => match kind.insert(conn, name) {
                Ok(id) => {
                    debug!("Created {} '{}' with id {}", kind, name, id);
                    id
                }
                // another run created it between our select and insert
                Err(e) if e.is_constraint_violation() => match kind.find_id(conn, name)? {
                    Some(id) => id,
                    None => return Err(e),
                },
                Err(e) => return Err(e),
            },
        };

        self.ids.entry(kind).or_default().insert(name.to_string(), id);
        Ok(id)
    }

    /// Forget everything, e.g. after the transaction that created rows rolled back
    pub fn clear(&mut self) {
        self.ids.clear();
    }

    /// Number of cached names across all kinds
    pub fn len(&self) -> usize {
        self.ids.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// How many times the store was consulted
    pub fn store_lookups(&self) -> usize {
        self.store_lookups
    }
}
