// src/reconcile/nvr.rs

//! Version-release ordering used to pick the newest package of a name
//!
//! Versions and releases are split on `.`, the shorter sequence is padded
//! with empty segments, and segments are compared left to right: as
//! integers of any length when both are all digits, as strings otherwise.
//! The version is decisive; the release only breaks ties.

use crate::parser::PackageHeader;
use std::cmp::Ordering;
use std::fmt;

/// The `(version, release)` pair of a package, ordered segment-wise
///
/// Equality follows the ordering, so `1.01` and `1.1` are equal versions.
#[derive(Debug, Clone)]
pub struct PackageVersion {
    pub version: String,
    pub release: String,
}

impl PackageVersion {
    pub fn new(version: impl Into<String>, release: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            release: release.into(),
        }
    }

    pub fn of(header: &PackageHeader) -> Self {
        Self::new(header.version.clone(), header.release.clone())
    }
}

impl PartialEq for PackageVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for PackageVersion {}

impl Ord for PackageVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        compare_segments(&self.version, &other.version)
            .then_with(|| compare_segments(&self.release, &other.release))
    }
}

impl PartialOrd for PackageVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for PackageVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.version, self.release)
    }
}

/// Compare two dotted strings segment by segment
pub fn compare_segments(a: &str, b: &str) -> Ordering {
    let left: Vec<&str> = a.split('.').collect();
    let right: Vec<&str> = b.split('.').collect();
    let width = left.len().max(right.len());

    for i in 0..width {
        let l = left.get(i).copied().unwrap_or("");
        let r = right.get(i).copied().unwrap_or("");
        let ord = if is_integer(l) && is_integer(r) {
            compare_integers(l, r)
        } else {
            l.cmp(r)
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

fn is_integer(segment: &str) -> bool {
    !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit())
}

/// Numeric order of two digit strings without a width limit
fn compare_integers(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}
