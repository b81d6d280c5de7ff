// src/commands/mod.rs
//! Command handlers for the rq CLI

mod package;
mod query;
mod tag;

pub use package::{cmd_examine, cmd_show_info, cmd_sxid, cmd_updates};
pub use query::{QueryDisplay, cmd_query};
pub use tag::{cmd_add, cmd_add_directory, cmd_delete, cmd_init, cmd_stats, cmd_tags, cmd_update};

use anyhow::Result;
use rq::{CliProgress, Config, PackageKind, ProgressTracker, SilentProgress};
use rusqlite::Connection;

/// Settings every command needs: configuration, database and catalog kind
pub struct Context {
    pub config: Config,
    pub db_path: String,
    pub kind: PackageKind,
}

impl Context {
    pub fn open(&self) -> Result<Connection> {
        Ok(rq::db::open(&self.db_path)?)
    }
}

/// A progress bar when requested, otherwise a silent tracker
pub(crate) fn progress_for(operation: &str, visible: bool) -> Box<dyn ProgressTracker> {
    if visible {
        Box::new(CliProgress::new(operation, 0))
    } else {
        Box::new(SilentProgress::new())
    }
}

/// Format a byte count for display
pub(crate) fn format_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KiB", "MiB", "GiB", "TiB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", size, UNITS[unit])
    }
}
