// src/tools/elf.rs

//! ELF inspection through binutils

use super::{SystemInspector, ToolCommand};
use crate::db::models::HardeningFlags;
use crate::error::Result;
use crate::parser::{classify_elf, parse_nm_symbols};
use goblin::elf::header::{ELFMAG, SELFMAG};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Whether `path` starts with the ELF magic
pub fn is_elf(path: &Path) -> bool {
    let mut magic = [0u8; SELFMAG];
    File::open(path)
        .and_then(|mut f| f.read_exact(&mut magic))
        .map(|_| &magic == ELFMAG)
        .unwrap_or(false)
}

impl SystemInspector {
    fn readelf(&self, args: &[&str], file: &Path) -> Result<String> {
        let cmd = ToolCommand::new(&self.tools.readelf).args(args).arg(file);
        Ok(self.runner.run_checked(&cmd)?.stdout)
    }

    pub(super) fn classify_file(&self, file: &Path) -> Result<HardeningFlags> {
        let program_headers = self.readelf(&["-l", "-W"], file)?;
        let dynamic = self.readelf(&["-d"], file)?;
        let symbols = self.readelf(&["-s", "-W"], file)?;
        let file_header = self.readelf(&["-h"], file)?;
        Ok(classify_elf(&program_headers, &dynamic, &symbols, &file_header))
    }

    pub(super) fn dynamic_symbols(&self, file: &Path) -> Result<Vec<String>> {
        let cmd = ToolCommand::new(&self.tools.nm).args(["-D", "-g"]).arg(file);
        let output = self.runner.run_checked(&cmd)?;
        Ok(parse_nm_symbols(&output.stdout))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_is_elf() {
        let dir = tempfile::tempdir().unwrap();

        let elf = dir.path().join("bin");
        let mut f = File::create(&elf).unwrap();
        f.write_all(b"\x7fELF\x02\x01\x01\x00rest-of-header").unwrap();
        assert!(is_elf(&elf));

        let script = dir.path().join("script");
        std::fs::write(&script, "#!/bin/sh\necho hi\n").unwrap();
        assert!(!is_elf(&script));

        let short = dir.path().join("short");
        std::fs::write(&short, b"\x7fE").unwrap();
        assert!(!is_elf(&short));

        assert!(!is_elf(&dir.path().join("missing")));
    }
}
