// src/cli/mod.rs
//! CLI definitions for rq
//!
//! This module contains all command-line interface definitions using clap.
//! The actual command implementations are in the `commands` module.
//!
//! Catalog maintenance:
//! - `init`, `add-directory`, `add`, `update`, `delete`
//!
//! Reporting:
//! - `tags`, `stats`, `updates`, `sxid`, `show-info`
//!
//! Searching:
//! - `query` - substring or regex search over files, dependencies, symbols,
//!   ctags and build requirements
//! - `examine` - inspect a source package without touching the catalog

use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use rq::query::QueryKind;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "rq")]
#[command(author = "rq Contributors")]
#[command(version)]
#[command(about = "Catalog RPM and SRPM package contents and query them", long_about = None)]
pub struct Cli {
    /// Configuration file (default: /etc/rq.toml, then ~/.config/rq/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to the database file (overrides the configuration)
    #[arg(short, long, global = true)]
    pub db_path: Option<String>,

    /// Work on the source package (SRPM) catalog
    #[arg(short, long, global = true)]
    pub source: bool,

    /// Increase log output (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    // =========================================================================
    // Catalog maintenance
    // =========================================================================
    /// Initialize the rq database
    Init,

    /// Create a tag and load every package found in a directory
    AddDirectory {
        /// Name of the new tag
        #[arg(short, long)]
        tag: String,

        /// Directory holding the tag's packages
        path: PathBuf,

        /// Directory scanned for updates instead of the tag directory
        #[arg(short, long)]
        update_path: Option<PathBuf>,

        /// Show a progress bar
        #[arg(long)]
        progress: bool,
    },

    /// Add a single package file to an existing tag
    Add {
        /// Tag to add the package to
        #[arg(short, long)]
        tag: String,

        /// Path to the package file
        package: PathBuf,
    },

    /// Re-synchronize a tag with its directory
    Update {
        /// Tag to update
        tag: String,

        /// Only print what would change
        #[arg(short, long)]
        list_only: bool,

        /// Show a progress bar
        #[arg(long)]
        progress: bool,
    },

    /// Delete a tag and everything recorded under it
    Delete {
        /// Tag to delete
        tag: String,
    },

    // =========================================================================
    // Reporting
    // =========================================================================
    /// List tags with their package and update counts
    Tags,

    /// Show record counts for one tag or the whole catalog
    Stats {
        /// Limit the counts to this tag
        tag: Option<String>,
    },

    /// List packages that arrived through an update
    Updates {
        /// Tag to report on
        tag: String,
    },

    /// List setuid or setgid files in a tag
    Sxid {
        /// Which bit to report
        #[arg(value_enum)]
        mode: SxidMode,

        /// Tag to report on
        tag: String,
    },

    /// Show what is recorded for a package name
    ShowInfo {
        /// Package name
        name: String,

        /// Limit to this tag
        #[arg(short, long)]
        tag: Option<String>,
    },

    // =========================================================================
    // Searching
    // =========================================================================
    /// Search the catalog
    ///
    /// Binary kinds: files, provides, requires, symbols, packages.
    /// Source kinds (with --source): files, ctags, buildreqs, packages.
    Query {
        /// What to search
        kind: QueryKind,

        /// Substring to look for (case-insensitive), or a regex with --regexp
        pattern: String,

        /// Limit the search to this tag
        #[arg(short, long)]
        tag: Option<String>,

        /// Treat the pattern as a regular expression
        #[arg(short, long)]
        regexp: bool,

        /// Print only the number of matches
        #[arg(long)]
        count: bool,

        /// Print only the matched values
        #[arg(short, long)]
        quiet: bool,

        /// Show owner, group and mode of matched files
        #[arg(short, long)]
        ownership: bool,

        /// Show build date and hardening flags of matched files
        #[arg(short, long)]
        extra_info: bool,
    },

    /// List the members of a source package without loading it
    Examine {
        /// Path to the source package
        package: PathBuf,

        /// Show the files each patch touches
        #[arg(long)]
        patches: bool,

        /// Do not list tarball contents
        #[arg(long)]
        skip_tar: bool,
    },

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Set-id bit selected by `rq sxid`
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SxidMode {
    Suid,
    Sgid,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["rq", "query", "files", "bash", "-s", "-vv", "--count"]).unwrap();
        assert!(cli.source);
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Some(Commands::Query { kind, pattern, count, .. }) => {
                assert_eq!(kind, QueryKind::Files);
                assert_eq!(pattern, "bash");
                assert!(count);
            }
            _ => panic!("expected query command"),
        }
    }

    #[test]
    fn test_unknown_query_kind_rejected() {
        assert!(Cli::try_parse_from(["rq", "query", "owners", "root"]).is_err());
    }
}
