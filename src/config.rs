// src/config.rs

//! Configuration file parsing for rq
//!
//! Supports TOML configuration files with the following sections:
//! - [database] - Location of the catalog database
//! - [tools] - External tool names and the per-invocation timeout
//! - [ingest] - File exclusions, requires filter and kept ctags kinds
//!
//! Without an explicit `--config`, `/etc/rq.toml` is read first and the
//! per-user `rq/config.toml` overrides it key by key within each section.

use crate::db::models::CtagKind;
use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// System-wide configuration file
pub const SYSTEM_CONFIG: &str = "/etc/rq.toml";

/// Environment variable that overrides `[database] path`
pub const DATABASE_ENV: &str = "RQ_DATABASE";

/// TOML configuration file structure
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseSection,

    #[serde(default)]
    pub tools: ToolsSection,

    #[serde(default)]
    pub ingest: IngestSection,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseSection {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self { path: default_db_path() }
    }
}

fn default_db_path() -> String {
    "/var/lib/rq/rq.db".to_string()
}

/// External tools, by program name or absolute path
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolsSection {
    /// Wall-clock bound for a single tool invocation
    pub timeout_secs: u64,
    pub rpm: String,
    pub rpm2cpio: String,
    pub cpio: String,
    pub readelf: String,
    pub nm: String,
    pub tar: String,
    pub ctags: String,
    pub bzip2: String,
}

impl Default for ToolsSection {
    fn default() -> Self {
        Self {
            timeout_secs: 300,
            rpm: "rpm".to_string(),
            rpm2cpio: "rpm2cpio".to_string(),
            cpio: "cpio".to_string(),
            readelf: "readelf".to_string(),
            nm: "nm".to_string(),
            tar: "tar".to_string(),
            ctags: "ctags".to_string(),
            bzip2: "bzip2".to_string(),
        }
    }
}

impl ToolsSection {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IngestSection {
    /// Substrings that exclude a path from every file listing
    pub file_excludes: Vec<String>,
    /// Substrings that drop a line from the requires listing
    pub requires_filter: Vec<String>,
    /// ctags kinds to keep
    pub ctag_kinds: Vec<String>,
}

impl Default for IngestSection {
    fn default() -> Self {
        Self {
            file_excludes: ["/.svn", "/CVS", "AUTHORS", "Makefile", "ChangeLog", "COPYING", "TODO", "README"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            requires_filter: ["rpmlib", "GLIBC", "GCC", "rtld"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            ctag_kinds: CtagKind::DEFAULT.iter().map(|k| k.to_string()).collect(),
        }
    }
}

impl IngestSection {
    /// The configured ctags kinds, parsed
    pub fn ctag_kinds(&self) -> Result<Vec<CtagKind>> {
        self.ctag_kinds
            .iter()
            .map(|k| k.parse::<CtagKind>().map_err(Error::ConfigError))
            .collect()
    }
}

impl Config {
    /// Load configuration: an explicit file if given, else the system and user files
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let files = match explicit {
            Some(path) => {
                if !path.is_file() {
                    return Err(Error::ConfigError(format!(
                        "Configuration file {} does not exist",
                        path.display()
                    )));
                }
                vec![path.to_path_buf()]
            }
            None => Self::default_locations()
                .into_iter()
                .filter(|p| p.is_file())
                .collect(),
        };

        Self::load_merged(&files)
    }

    /// Standard lookup locations, lowest precedence first
    pub fn default_locations() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(SYSTEM_CONFIG)];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("rq").join("config.toml"));
        }
        paths
    }

    /// Parse and merge `files` in order; later files override earlier keys
    pub fn load_merged(files: &[PathBuf]) -> Result<Self> {
        let mut merged = toml::Table::new();

        for path in files {
            debug!("Reading configuration from {}", path.display());
            let content = std::fs::read_to_string(path).map_err(|e| {
                Error::ConfigError(format!("Failed to read {}: {}", path.display(), e))
            })?;
            let table: toml::Table = content.parse().map_err(|e| {
                Error::ConfigError(format!("Failed to parse {}: {}", path.display(), e))
            })?;
            merge_tables(&mut merged, table);
        }

        let config: Config = toml::Value::Table(merged)
            .try_into()
            .map_err(|e: toml::de::Error| Error::ConfigError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.ingest.ctag_kinds()?;
        if self.ingest.ctag_kinds.is_empty() {
            return Err(Error::ConfigError("ingest.ctag_kinds must not be empty".to_string()));
        }
        if self.tools.timeout_secs == 0 {
            return Err(Error::ConfigError("tools.timeout_secs must be positive".to_string()));
        }
        Ok(())
    }

    /// Database path after applying the `RQ_DATABASE` override
    pub fn database_path(&self) -> String {
        std::env::var(DATABASE_ENV)
            .ok()
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| self.database.path.clone())
    }
}

/// Merge `overlay` into `base`; nested tables merge key by key
fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
                merge_tables(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}
