// src/parser/listing.rs

//! Verbose package file listings (`rpm -qlvp`)
//!
//! Lines look like `ls -l` output:
//!
//! ```text
//! -rwsr-xr-x    1 root     root        52984 Jan 28  2020 /usr/bin/passwd
//! ```
//!
//! Owner and group are printed in 8-character columns. When a long owner
//! name runs into the group column the two appear as one token; that token
//! is split at position 8. This recovers the common case only: a name that
//! was itself truncated or an owner of exactly 8 characters followed by a
//! long group can still be split wrongly, so treat owner/group as
//! approximate for such packages.

use tracing::warn;

/// One entry of a package's file listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileListing {
    pub path: String,
    pub owner: String,
    pub group: String,
    /// Four-digit octal permission string; the set-id bits live in its first digit
    pub perms: String,
}

const OWNER_WIDTH: usize = 8;

/// Parse a verbose listing, dropping paths that contain any of `excludes`
pub fn parse_file_listing(output: &str, excludes: &[String]) -> Vec<FileListing> {
    let mut entries = Vec::new();

    for line in output.lines() {
        let line = line.trim_end();
        if line.trim().is_empty() || line.contains("(contains no files)") {
            continue;
        }

        match parse_line(line) {
            Some(entry) => {
                if excludes.iter().any(|e| entry.path.contains(e.as_str())) {
                    continue;
                }
                entries.push(entry);
            }
            None => warn!("Skipping unparseable listing line: {}", line),
        }
    }

    entries
}

fn parse_line(line: &str) -> Option<FileListing> {
    let (fields, rest) = take_fields(line, 8);
    if fields.len() < 8 {
        return None;
    }

    let (owner, group, path) = if fields[2].len() > OWNER_WIDTH && fields[3].parse::<u64>().is_ok() {
        // owner and group ran together; the size sits where the group should be
        let (_, rest) = take_fields(line, 7);
        let merged = fields[2];
        let split = merged
            .char_indices()
            .nth(OWNER_WIDTH)
            .map(|(i, _)| i)
            .unwrap_or(merged.len());
        (&merged[..split], &merged[split..], rest)
    } else {
        (fields[2], fields[3], rest)
    };

    let path = match path.split_once(" -> ") {
        Some((link, _)) if fields[0].starts_with('l') => link,
        _ => path,
    };
    if path.is_empty() {
        return None;
    }

    let perms = mode_to_perms(fields[0])?;
    Some(FileListing {
        path: path.to_string(),
        owner: owner.to_string(),
        group: group.to_string(),
        perms,
    })
}

/// Split off the first `n` whitespace-separated fields, returning the rest verbatim
fn take_fields(line: &str, n: usize) -> (Vec<&str>, &str) {
    let mut fields = Vec::with_capacity(n);
    let mut rest = line.trim_start();
    while fields.len() < n && !rest.is_empty() {
        let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        fields.push(&rest[..end]);
        rest = rest[end..].trim_start();
    }
    (fields, rest)
}

/// Convert an `ls`-style mode (`-rwsr-xr-x`) to a four-digit octal string
pub fn mode_to_perms(mode: &str) -> Option<String> {
    let bits: Vec<char> = mode.chars().collect();
    if bits.len() < 10 {
        return None;
    }

    let triad = |r: char, w: char, x: char, special: &[char]| -> Option<(u32, bool)> {
        let mut value = 0;
        match r {
            'r' => value += 4,
            '-' => {}
            _ => return None,
        }
        match w {
            'w' => value += 2,
            '-' => {}
            _ => return None,
        }
        let lower_special = special[0];
        let upper_special = special[1];
        let flagged = x == lower_special || x == upper_special;
        if x == 'x' || x == lower_special {
            value += 1;
        } else if x != '-' && x != upper_special {
            return None;
        }
        Some((value, flagged))
    };

    let (user, suid) = triad(bits[1], bits[2], bits[3], &['s', 'S'])?;
    let (group, sgid) = triad(bits[4], bits[5], bits[6], &['s', 'S'])?;
    let (other, sticky) = triad(bits[7], bits[8], bits[9], &['t', 'T'])?;

    let special = (suid as u32) * 4 + (sgid as u32) * 2 + sticky as u32;
    Some(format!("{}{}{}{}", special, user, group, other))
}
