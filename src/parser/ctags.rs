// src/parser/ctags.rs

use crate::db::models::{CtagEntry, CtagKind};
use tracing::debug;

/// Parse `ctags -x` cross-reference output.
///
/// Each line is `name kind line file extra`; entries whose kind is not in
/// `kinds`, or lines that do not have all five fields, are dropped.
pub fn parse_ctags(output: &str, kinds: &[CtagKind]) -> Vec<CtagEntry> {
    let mut entries = Vec::new();

    for line in output.lines() {
        let mut rest = line.trim_start();
        let mut fields = Vec::with_capacity(4);
        while fields.len() < 4 {
            let Some(end) = rest.find(char::is_whitespace) else {
                break;
            };
            fields.push(&rest[..end]);
            rest = rest[end..].trim_start();
        }
        let extra = rest.trim_end();
        if fields.len() < 4 || extra.is_empty() {
            continue;
        }

        let Ok(kind) = fields[1].parse::<CtagKind>() else {
            continue;
        };
        if !kinds.contains(&kind) {
            continue;
        }
        let Ok(line_no) = fields[2].parse::<i64>() else {
            debug!("Skipping ctags line with bad line number: {}", line);
            continue;
        };

        entries.push(CtagEntry {
            name: fields[0].to_string(),
            kind,
            line: line_no,
            file: fields[3].to_string(),
            extra: extra.to_string(),
        });
    }

    entries
}
