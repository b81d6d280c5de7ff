// src/parser/source.rs

//! Source package members: patches and tarballs

use crate::db::models::SourceKind;
use regex::Regex;
use std::sync::LazyLock;

static PATCH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\.(diff|dif|patch)(\.bz2|\.gz)?$").expect("valid patch regex")
});
static TARBALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\.((tar)(\.bz2|\.gz|\.xz)?|t(gz|bz2?|xz))$").expect("valid tarball regex")
});

/// Compression wrapping a patch or tarball
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Gzip,
    Bzip2,
    Xz,
}

impl Compression {
    fn from_name(name: &str) -> Self {
        if name.ends_with(".gz") || name.ends_with(".tgz") {
            Compression::Gzip
        } else if name.ends_with(".bz2") || name.ends_with(".tbz") || name.ends_with(".tbz2") {
            Compression::Bzip2
        } else if name.ends_with(".xz") || name.ends_with(".txz") {
            Compression::Xz
        } else {
            Compression::None
        }
    }

    /// `tar` mode letters for listing (`t`) or extracting (`x`)
    pub fn tar_flags(&self, mode: char) -> String {
        match self {
            Compression::None => format!("-{}f", mode),
            Compression::Gzip => format!("-{}zf", mode),
            Compression::Bzip2 => format!("-{}jf", mode),
            Compression::Xz => format!("-{}Jf", mode),
        }
    }
}

/// A tracked source member: what it is and how it is compressed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceClass {
    pub kind: SourceKind,
    pub compression: Compression,
}

/// Classify a member of a source package; `None` for files not tracked as sources
pub fn classify_source(file_name: &str) -> Option<SourceClass> {
    let kind = if PATCH.is_match(file_name) {
        SourceKind::Patch
    } else if TARBALL.is_match(file_name) {
        SourceKind::Tarball
    } else {
        return None;
    };

    Some(SourceClass {
        kind,
        compression: Compression::from_name(file_name),
    })
}

/// Whether `path` contains any of the administrative exclusions
pub fn is_excluded_path(path: &str, excludes: &[String]) -> bool {
    excludes.iter().any(|e| path.contains(e.as_str()))
}

/// Parse a tar table of contents, dropping directories and excluded paths
pub fn parse_tar_listing(output: &str, excludes: &[String]) -> Vec<String> {
    output
        .lines()
        .map(str::trim_end)
        .filter(|l| !l.is_empty() && !l.ends_with('/'))
        .filter(|l| !is_excluded_path(l, excludes))
        .map(str::to_string)
        .collect()
}

/// Files a patch touches: the second field of every `+++` line
pub fn parse_patch_targets(patch: &str) -> Vec<String> {
    patch
        .lines()
        .filter(|l| l.starts_with("+++"))
        .filter_map(|l| l.split_whitespace().nth(1))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_patches() {
        for name in ["fix.patch", "fix.diff", "fix.dif", "fix.patch.gz", "fix.diff.bz2"] {
            let class = classify_source(name).unwrap();
            assert_eq!(class.kind, SourceKind::Patch, "{}", name);
        }
        assert_eq!(classify_source("fix.patch.gz").unwrap().compression, Compression::Gzip);
        assert_eq!(classify_source("fix.patch").unwrap().compression, Compression::None);
    }

    #[test]
    fn test_classify_tarballs() {
        for name in [
            "bash-5.0.tar",
            "bash-5.0.tar.gz",
            "bash-5.0.tar.bz2",
            "bash-5.0.tgz",
            "bash-5.0.tbz",
            "bash-5.0.tbz2",
            "bash-5.0.tar.xz",
        ] {
            let class = classify_source(name).unwrap();
            assert_eq!(class.kind, SourceKind::Tarball, "{}", name);
        }
        assert_eq!(classify_source("a.tgz").unwrap().compression.tar_flags('t'), "-tzf");
        assert_eq!(classify_source("a.tar.bz2").unwrap().compression.tar_flags('x'), "-xjf");
        assert_eq!(classify_source("a.tar").unwrap().compression.tar_flags('t'), "-tf");
        assert_eq!(classify_source("a.tar.xz").unwrap().compression.tar_flags('t'), "-tJf");
    }

    #[test]
    fn test_untracked_members() {
        assert!(classify_source("bash.spec").is_none());
        assert!(classify_source("bash-5.0.tar.gz.sig").is_none());
        assert!(classify_source("README").is_none());
        assert!(classify_source("patches.zip").is_none());
    }

    #[test]
    fn test_tar_listing() {
        let output = "bash-5.0/\nbash-5.0/shell.c\nbash-5.0/CVS/Root\nbash-5.0/doc/\nbash-5.0/doc/bash.1\n";
        let excludes = crate::config::IngestSection::default().file_excludes;
        assert_eq!(
            parse_tar_listing(output, &excludes),
            vec!["bash-5.0/shell.c", "bash-5.0/doc/bash.1"]
        );
    }

    #[test]
    fn test_patch_targets() {
        let patch = "\
--- bash-5.0/config-top.h.orig\t2020-01-01
+++ bash-5.0/config-top.h\t2020-01-02
@@ -1,3 +1,3 @@
-old
+new
--- bash-5.0/shell.c
+++ bash-5.0/shell.c
";
        assert_eq!(
            parse_patch_targets(patch),
            vec!["bash-5.0/config-top.h", "bash-5.0/shell.c"]
        );
    }
}
