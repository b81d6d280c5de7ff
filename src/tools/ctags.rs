// src/tools/ctags.rs

use super::{SystemInspector, ToolCommand};
use crate::db::models::CtagEntry;
use crate::error::Result;
use crate::parser::parse_ctags;
use std::path::Path;
use tracing::warn;

impl SystemInspector {
    /// `ctags -x -R -f - .` inside `tree`
    pub(super) fn index_tree(&self, tree: &Path) -> Result<Vec<CtagEntry>> {
        let cmd = ToolCommand::new(&self.tools.ctags)
            .args(["-x", "-R", "-f", "-", "."])
            .current_dir(tree);
        let output = self.runner.run(&cmd)?;
        if !output.success() {
            // ctags exits non-zero on unreadable files but still indexes the rest
            warn!(
                "ctags exited with {} in {}: {}",
                output.status,
                tree.display(),
                output.stderr.trim()
            );
        }
        Ok(parse_ctags(&output.stdout, &self.ctag_kinds))
    }
}
