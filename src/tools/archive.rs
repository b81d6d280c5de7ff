// src/tools/archive.rs

//! Tarball and patch handling for source packages

use super::{SystemInspector, ToolCommand};
use crate::db::models::SourceKind;
use crate::error::{Error, Result};
use crate::parser::{Compression, classify_source, parse_patch_targets, parse_tar_listing};
use flate2::read::GzDecoder;
use std::fs::File;
use std::io::Read;
use std::path::Path;

impl SystemInspector {
    /// `--exclude` options for the administrative file set; tar matches
    /// member names without a leading `/`
    fn tar_excludes(&self) -> Vec<String> {
        self.ingest
            .file_excludes
            .iter()
            .map(|e| format!("--exclude={}", e.strip_prefix('/').unwrap_or(e)))
            .collect()
    }

    fn tarball_compression(archive: &Path) -> Result<Compression> {
        let name = archive
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        match classify_source(&name) {
            Some(class) if class.kind == SourceKind::Tarball => Ok(class.compression),
            _ => Err(Error::ValidationError(format!("{} is not a tarball", archive.display()))),
        }
    }

    pub(super) fn list_archive(&self, archive: &Path) -> Result<Vec<String>> {
        let compression = Self::tarball_compression(archive)?;
        let cmd = ToolCommand::new(&self.tools.tar)
            .args(self.tar_excludes())
            .arg(compression.tar_flags('t'))
            .arg(archive);
        let output = self.runner.run_checked(&cmd)?;
        Ok(parse_tar_listing(&output.stdout, &self.ingest.file_excludes))
    }

    pub(super) fn extract_archive(&self, archive: &Path, dest: &Path) -> Result<()> {
        let compression = Self::tarball_compression(archive)?;
        let cmd = ToolCommand::new(&self.tools.tar)
            .args(self.tar_excludes())
            .arg(compression.tar_flags('x'))
            .arg(archive)
            .arg("-C")
            .arg(dest);
        self.runner.run_checked(&cmd)?;
        Ok(())
    }

    pub(super) fn patch_targets(&self, patch: &Path) -> Result<Vec<String>> {
        let name = patch
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let compression = match classify_source(&name) {
            Some(class) if class.kind == SourceKind::Patch => class.compression,
            _ => return Err(Error::ValidationError(format!("{} is not a patch", patch.display()))),
        };

        let bytes = match compression {
            Compression::None => std::fs::read(patch)?,
            Compression::Gzip => {
                let mut buf = Vec::new();
                GzDecoder::new(File::open(patch)?).read_to_end(&mut buf)?;
                buf
            }
            Compression::Bzip2 => {
                let cmd = ToolCommand::new(&self.tools.bzip2).arg("-dc").arg(patch);
                self.runner.run_checked(&cmd)?.stdout.into_bytes()
            }
            Compression::Xz => {
                return Err(Error::ValidationError(format!(
                    "Unsupported patch compression: {}",
                    patch.display()
                )));
            }
        };

        Ok(parse_patch_targets(&String::from_utf8_lossy(&bytes)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use flate2::Compression as GzLevel;
    use flate2::write::GzEncoder;
    use std::io::Write;

    const PATCH: &str = "--- a/shell.c\n+++ b/shell.c\n@@ -1 +1 @@\n-x\n+y\n";

    fn inspector() -> SystemInspector {
        SystemInspector::new(&Config::default()).unwrap()
    }

    #[test]
    fn test_tar_excludes_strip_leading_slash() {
        let excludes = inspector().tar_excludes();
        assert!(excludes.contains(&"--exclude=.svn".to_string()));
        assert!(excludes.contains(&"--exclude=CVS".to_string()));
        assert!(excludes.contains(&"--exclude=README".to_string()));
    }

    #[test]
    fn test_plain_patch_targets() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fix.patch");
        std::fs::write(&path, PATCH).unwrap();
        assert_eq!(inspector().patch_targets(&path).unwrap(), vec!["b/shell.c"]);
    }

    #[test]
    fn test_gzip_patch_targets() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fix.patch.gz");
        let mut encoder = GzEncoder::new(File::create(&path).unwrap(), GzLevel::default());
        encoder.write_all(PATCH.as_bytes()).unwrap();
        encoder.finish().unwrap();
        assert_eq!(inspector().patch_targets(&path).unwrap(), vec!["b/shell.c"]);
    }

    #[test]
    fn test_not_a_patch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bash.spec");
        std::fs::write(&path, "Name: bash\n").unwrap();
        assert!(matches!(inspector().patch_targets(&path), Err(Error::ValidationError(_))));
        assert!(matches!(inspector().list_archive(&path), Err(Error::ValidationError(_))));
    }
}
