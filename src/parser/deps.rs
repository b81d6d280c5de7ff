// src/parser/deps.rs

/// Parse a provides/requires listing.
///
/// Lines containing any of `filter` are dropped and consecutive identical
/// lines collapse to one. Non-adjacent repeats are kept.
pub fn parse_dependencies(output: &str, filter: &[String]) -> Vec<String> {
    let mut deps: Vec<String> = Vec::new();

    for line in output.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if filter.iter().any(|f| line.contains(f.as_str())) {
            continue;
        }
        if deps.last().is_some_and(|last| last == line) {
            continue;
        }
        deps.push(line.to_string());
    }

    deps
}
