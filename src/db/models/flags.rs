// src/db/models/flags.rs

//! Hardening flags of ELF files
//!
//! Each flag is a small closed enum whose `as_str` form is exactly the
//! text stored in (and constrained by) the `flags` table.

use super::{PackageRef, conversion_error};
use crate::error::Result;
use rusqlite::{Connection, OptionalExtension, params};
use std::fmt;
use std::str::FromStr;

macro_rules! flag_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    _ => Err(format!("Invalid {} value: {}", stringify!($name), s)),
                }
            }
        }
    };
}

flag_enum! {
    /// Relocation read-only protection
    Relro { None => "none", Partial => "partial", Full => "full" }
}

flag_enum! {
    /// Stack-smashing protector
    StackProtector { NotFound => "not found", Found => "found" }
}

flag_enum! {
    /// Position independence
    Pie { None => "none", Enabled => "enabled", Dso => "DSO" }
}

flag_enum! {
    /// `_FORTIFY_SOURCE` checked functions
    Fortify { NotFound => "not found", Found => "found" }
}

flag_enum! {
    /// Non-executable stack
    Nx { Disabled => "disabled", Enabled => "enabled" }
}

/// The full hardening posture of one ELF file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HardeningFlags {
    pub relro: Relro,
    pub ssp: StackProtector,
    pub pie: Pie,
    pub fortify: Fortify,
    pub nx: Nx,
}

impl HardeningFlags {
    /// Store the flags for a file of a package
    pub fn insert(&self, conn: &Connection, package: PackageRef, file_id: i64) -> Result<i64> {
        conn.execute(
            "INSERT INTO flags (tag_id, package_id, file_id, relro, ssp, pie, fortify, nx)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                package.tag_id,
                package.id,
                file_id,
                self.relro.as_str(),
                self.ssp.as_str(),
                self.pie.as_str(),
                self.fortify.as_str(),
                self.nx.as_str(),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Flags recorded for a file
    pub fn find_by_file(conn: &Connection, file_id: i64) -> Result<Option<Self>> {
        let flags = conn
            .query_row(
                "SELECT relro, ssp, pie, fortify, nx FROM flags WHERE file_id = ?1",
                [file_id],
                |row| {
                    let relro: String = row.get(0)?;
                    let ssp: String = row.get(1)?;
                    let pie: String = row.get(2)?;
                    let fortify: String = row.get(3)?;
                    let nx: String = row.get(4)?;
                    Ok(Self {
                        relro: relro.parse().map_err(|e| conversion_error(0, e))?,
                        ssp: ssp.parse().map_err(|e| conversion_error(1, e))?,
                        pie: pie.parse().map_err(|e| conversion_error(2, e))?,
                        fortify: fortify.parse().map_err(|e| conversion_error(3, e))?,
                        nx: nx.parse().map_err(|e| conversion_error(4, e))?,
                    })
                },
            )
            .optional()?;
        Ok(flags)
    }
}
