// src/parser/header.rs

use crate::db::models::PackageKind;
use crate::error::{Error, Result};
use regex::Regex;
use std::sync::LazyLock;

/// Query format used to read a package header in one call
pub const HEADER_QUERY_FORMAT: &str =
    "%{NAME}|%{VERSION}|%{RELEASE}|%{BUILDTIME}|%{ARCH}|%{SOURCERPM}";

static SRPM_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.+?)-[0-9]").expect("valid source package regex"));

/// Identity and build metadata read from a package header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageHeader {
    pub name: String,
    pub version: String,
    pub release: String,
    pub build_time: String,
    /// `src` for source packages
    pub arch: String,
    /// Base name of the originating source package (binary packages only)
    pub source_rpm: Option<String>,
}

/// Parse the output of a header query made with [`HEADER_QUERY_FORMAT`]
pub fn parse_header(output: &str, kind: PackageKind) -> Result<PackageHeader> {
    let line = output.lines().map(str::trim).find(|l| !l.is_empty()).ok_or_else(|| {
        Error::ToolError("Package header query returned no output".to_string())
    })?;

    let fields: Vec<&str> = line.split('|').map(str::trim).collect();
    if fields.len() < 4 {
        return Err(Error::ParseError(format!("Malformed package header: {}", line)));
    }
    if fields[..3].iter().any(|f| f.is_empty()) {
        return Err(Error::ParseError(format!("Package header lacks name/version/release: {}", line)));
    }

    let (arch, source_rpm) = match kind {
        PackageKind::Source => ("src".to_string(), None),
        PackageKind::Binary => {
            let arch = fields.get(4).copied().unwrap_or_default();
            if arch.is_empty() {
                return Err(Error::ParseError(format!("Package header lacks an architecture: {}", line)));
            }
            let source_rpm = fields
                .get(5)
                .copied()
                .filter(|s| !s.is_empty() && *s != "(none)")
                .map(srpm_base_name);
            (arch.to_string(), source_rpm)
        }
    };

    Ok(PackageHeader {
        name: fields[0].to_string(),
        version: fields[1].to_string(),
        release: fields[2].to_string(),
        build_time: fields[3].to_string(),
        arch,
        source_rpm,
    })
}

/// Strip version, release and suffix from a source package file name:
/// `bash-5.0.11-2.fc32.src.rpm` becomes `bash`
pub fn srpm_base_name(srpm: &str) -> String {
    SRPM_NAME
        .captures(srpm)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| srpm.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_binary_header() {
        let header = parse_header(
            "bash|5.0.11|2.fc32|1580212345|x86_64|bash-5.0.11-2.fc32.src.rpm",
            PackageKind::Binary,
        )
        .unwrap();
        assert_eq!(header.name, "bash");
        assert_eq!(header.version, "5.0.11");
        assert_eq!(header.release, "2.fc32");
        assert_eq!(header.build_time, "1580212345");
        assert_eq!(header.arch, "x86_64");
        assert_eq!(header.source_rpm.as_deref(), Some("bash"));
    }

    #[test]
    fn test_parse_source_header() {
        let header = parse_header("bash|5.0.11|2.fc32|1580212345|x86_64|(none)", PackageKind::Source)
            .unwrap();
        assert_eq!(header.arch, "src");
        assert!(header.source_rpm.is_none());
    }

    #[test]
    fn test_empty_output_is_tool_error() {
        assert!(matches!(parse_header("", PackageKind::Binary), Err(Error::ToolError(_))));
        assert!(matches!(parse_header("\n  \n", PackageKind::Binary), Err(Error::ToolError(_))));
    }

    #[test]
    fn test_malformed_header() {
        assert!(matches!(parse_header("bash|5.0", PackageKind::Binary), Err(Error::ParseError(_))));
        assert!(matches!(parse_header("|5.0|1|0|x86_64|x", PackageKind::Binary), Err(Error::ParseError(_))));
        assert!(matches!(parse_header("bash|5.0|1|0||x", PackageKind::Binary), Err(Error::ParseError(_))));
    }

    #[test]
    fn test_srpm_base_name() {
        assert_eq!(srpm_base_name("bash-5.0.11-2.fc32.src.rpm"), "bash");
        assert_eq!(srpm_base_name("perl-Foo-Bar-1.2-1.src.rpm"), "perl-Foo-Bar");
        assert_eq!(srpm_base_name("python3-3.8.2-1.src.rpm"), "python3");
        assert_eq!(srpm_base_name("weird"), "weird");
    }
}
