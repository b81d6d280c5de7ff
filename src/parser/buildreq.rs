// src/parser/buildreq.rs

const COMPARATORS: &[&str] = &["=", "<", ">", "<=", ">="];

/// Extract build requirements from a spec file.
///
/// Lines starting with `BuildRequires` (any case) are split on whitespace
/// and commas. A name followed by a comparator and a version is kept as
/// one `name op version` expression. Duplicates are dropped, first
/// occurrence wins.
pub fn parse_build_requirements(spec: &str) -> Vec<String> {
    let mut reqs: Vec<String> = Vec::new();

    for line in spec.lines() {
        if !line.to_lowercase().starts_with("buildrequire") {
            continue;
        }

        let tokens: Vec<&str> = line
            .split_whitespace()
            .skip(1)
            .flat_map(|word| word.split(','))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .collect();

        let mut i = 0;
        while i < tokens.len() {
            let expr = match (tokens.get(i + 1), tokens.get(i + 2)) {
                (Some(op), Some(version)) if COMPARATORS.contains(op) => {
                    i += 3;
                    format!("{} {} {}", tokens[i - 3], op, version)
                }
                (Some(op), None) if COMPARATORS.contains(op) => {
                    i += 2;
                    format!("{} {}", tokens[i - 2], op)
                }
                _ => {
                    i += 1;
                    tokens[i - 1].to_string()
                }
            };

            if !reqs.contains(&expr) {
                reqs.push(expr);
            }
        }
    }

    reqs
}
