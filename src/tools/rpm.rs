// src/tools/rpm.rs

//! Package queries through the `rpm` command line tool

use super::{SystemInspector, ToolCommand};
use crate::db::models::{DependencyKind, PackageKind};
use crate::error::{Error, Result};
use crate::parser::{
    FileListing, HEADER_QUERY_FORMAT, PackageHeader, parse_dependencies, parse_file_listing,
    parse_header,
};
use std::path::Path;
use tracing::debug;

impl SystemInspector {
    fn rpm_query(&self) -> ToolCommand {
        ToolCommand::new(&self.tools.rpm).args(["-qp", "--nosignature"])
    }

    pub(super) fn query_header(&self, package: &Path, kind: PackageKind) -> Result<PackageHeader> {
        let cmd = self.rpm_query().args(["--qf", HEADER_QUERY_FORMAT]).arg(package);
        let output = self.runner.run_checked(&cmd)?;
        let header = parse_header(&output.stdout, kind)?;
        debug!(
            "Header of {}: {}-{}-{}.{}",
            package.display(),
            header.name,
            header.version,
            header.release,
            header.arch
        );
        Ok(header)
    }

    pub(super) fn query_files(&self, package: &Path) -> Result<Vec<FileListing>> {
        let cmd = self.rpm_query().arg("-lv").arg(package);
        let output = self.runner.run_checked(&cmd)?;
        Ok(parse_file_listing(&output.stdout, &self.ingest.file_excludes))
    }

    pub(super) fn query_dependencies(&self, package: &Path, kind: DependencyKind) -> Result<Vec<String>> {
        let (flag, filter) = match kind {
            DependencyKind::Provides => ("--provides", [].as_slice()),
            DependencyKind::Requires => ("--requires", self.ingest.requires_filter.as_slice()),
        };
        let cmd = self.rpm_query().arg(flag).arg(package);
        let output = self.runner.run_checked(&cmd)?;
        Ok(parse_dependencies(&output.stdout, filter))
    }

    /// `rpm2cpio PACKAGE | cpio -d -i` inside `dest`
    pub(super) fn explode_payload(&self, package: &Path, dest: &Path) -> Result<()> {
        if !dest.is_dir() {
            return Err(Error::ValidationError(format!(
                "Extraction directory {} does not exist",
                dest.display()
            )));
        }

        let rpm2cpio = ToolCommand::new(&self.tools.rpm2cpio).arg(package);
        let cpio = ToolCommand::new(&self.tools.cpio)
            .args(["-d", "-i", "--quiet", "--no-absolute-filenames"])
            .current_dir(dest);
        self.runner.pipeline(&rpm2cpio, &cpio)?;
        debug!("Exploded {} into {}", package.display(), dest.display());
        Ok(())
    }
}
