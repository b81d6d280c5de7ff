// src/db/models/mod.rs

//! Data models for rq database entities
//!
//! This module defines Rust structs that correspond to database tables
//! and provides methods for creating, reading, updating, and deleting records.
//! Every child record is created from a [`PackageRef`], which carries both
//! the package id and its tag id so that a child can never be filed under a
//! different tag than its package.

mod already_seen;
mod build_requirement;
mod ctag;
mod dependency;
mod file_entry;
mod flags;
mod package;
mod reference;
mod source;
mod symbol;
mod tag;

pub use already_seen::AlreadySeen;
pub use build_requirement::BuildRequirement;
pub use ctag::{CtagEntry, CtagKind};
pub use dependency::{DependencyEntry, DependencyKind};
pub use file_entry::{FileEntry, SourceFileEntry, SxidFile};
pub use flags::{Fortify, HardeningFlags, Nx, Pie, Relro, StackProtector};
pub use package::{Package, PackageRef};
pub use reference::ReferenceKind;
pub use source::{SourceEntry, SourceKind};
pub use symbol::SymbolEntry;
pub use tag::{Tag, TagStats, TagSummary};

use std::fmt;
use std::str::FromStr;

/// Which catalog a tag (and everything under it) belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PackageKind {
    /// Binary packages (`*.rpm`)
    Binary,
    /// Source packages (`*.src.rpm`)
    Source,
}

impl PackageKind {
    pub fn as_str(&self) -> &str {
        match self {
            PackageKind::Binary => "binary",
            PackageKind::Source => "source",
        }
    }

    /// Human label used in user-facing messages
    pub fn label(&self) -> &str {
        match self {
            PackageKind::Binary => "RPM",
            PackageKind::Source => "SRPM",
        }
    }

    /// Whether a file name has the extension expected for this kind
    pub fn matches_file_name(&self, file_name: &str) -> bool {
        match self {
            PackageKind::Binary => file_name.ends_with(".rpm") && !file_name.ends_with(".src.rpm"),
            PackageKind::Source => file_name.ends_with(".src.rpm"),
        }
    }
}

impl fmt::Display for PackageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PackageKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "binary" => Ok(PackageKind::Binary),
            "source" => Ok(PackageKind::Source),
            _ => Err(format!("Invalid package kind: {}", s)),
        }
    }
}

/// Build a `FromSqlConversionFailure` for a text column that did not parse
pub(crate) fn conversion_error(column: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        column,
        rusqlite::types::Type::Text,
        Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, message)),
    )
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_package_kind_roundtrip() {
        assert_eq!("binary".parse::<PackageKind>().unwrap(), PackageKind::Binary);
        assert_eq!("source".parse::<PackageKind>().unwrap(), PackageKind::Source);
        assert!("other".parse::<PackageKind>().is_err());
        assert_eq!(PackageKind::Source.to_string(), "source");
    }

    #[test]
    fn test_package_kind_file_names() {
        assert!(PackageKind::Binary.matches_file_name("bash-5.0-1.fc32.x86_64.rpm"));
        assert!(!PackageKind::Binary.matches_file_name("bash-5.0-1.fc32.src.rpm"));
        assert!(PackageKind::Source.matches_file_name("bash-5.0-1.fc32.src.rpm"));
        assert!(!PackageKind::Source.matches_file_name("bash-5.0-1.fc32.x86_64.rpm"));
        assert!(!PackageKind::Binary.matches_file_name("bash.tar.gz"));
    }
}
