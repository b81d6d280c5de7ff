// src/parser/mod.rs

//! Parsers for external tool output
//!
//! Each parser turns the raw text of one tool into typed records. None of
//! them spawn processes, so they are tested directly against fixture text.

mod buildreq;
mod ctags;
mod deps;
mod elf;
mod header;
mod listing;
mod source;

pub use buildreq::parse_build_requirements;
pub use ctags::parse_ctags;
pub use deps::parse_dependencies;
pub use elf::{classify_elf, filter_symbols, is_excluded_symbol, parse_nm_symbols};
pub use header::{HEADER_QUERY_FORMAT, PackageHeader, parse_header, srpm_base_name};
pub use listing::{FileListing, mode_to_perms, parse_file_listing};
pub use source::{
    Compression, SourceClass, classify_source, is_excluded_path, parse_patch_targets,
    parse_tar_listing,
};
