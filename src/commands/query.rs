// src/commands/query.rs

//! `rq query`: search the catalog

use super::Context;
use anyhow::Result;
use rq::query::{self, QueryKind, QueryMatch, QueryOptions};
use rq::{PackageKind, Tag};
use rusqlite::Connection;

/// How matches are printed
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryDisplay {
    pub count: bool,
    pub quiet: bool,
    pub ownership: bool,
    pub extra_info: bool,
}

pub fn cmd_query(
    ctx: &Context,
    kind: QueryKind,
    pattern: &str,
    tag: Option<&str>,
    regexp: bool,
    display: QueryDisplay,
) -> Result<()> {
    let conn = ctx.open()?;
    if let Some(name) = tag {
        Tag::lookup(&conn, ctx.kind, name)?;
    }

    let opts = QueryOptions {
        kind: ctx.kind,
        tag: tag.map(String::from),
        regexp,
    };

    if display.count {
        println!("{}", query::count(&conn, kind, pattern, &opts)?);
        return Ok(());
    }

    let matches = query::search(&conn, kind, pattern, &opts)?;
    if matches.is_empty() {
        if !display.quiet {
            println!("No matches for '{}'.", pattern);
        }
        return Ok(());
    }

    let mut current_tag: Option<&str> = None;
    for hit in &matches {
        if display.quiet {
            println!("{}", hit.value);
            continue;
        }
        if current_tag != Some(hit.tag.as_str()) {
            println!("\n{} tag '{}':", ctx.kind.label(), hit.tag);
            current_tag = Some(hit.tag.as_str());
        }
        println!("  {}", describe(kind, ctx.kind, hit, display));
        if display.extra_info && kind == QueryKind::Files && ctx.kind == PackageKind::Binary {
            print_extra_info(&conn, hit)?;
        }
    }

    if !display.quiet {
        println!("\n{} matches", matches.len());
    }
    Ok(())
}

fn describe(kind: QueryKind, catalog: PackageKind, hit: &QueryMatch, display: QueryDisplay) -> String {
    let detail = |i: usize| hit.details.get(i).map(String::as_str).unwrap_or("");
    match (kind, catalog) {
        (QueryKind::Files, PackageKind::Binary) if display.ownership => format!(
            "{} [{}:{} {}] ({})",
            hit.value,
            detail(0),
            detail(1),
            detail(2),
            hit.package
        ),
        (QueryKind::Files, PackageKind::Source) => {
            format!("{} in {} ({})", hit.value, detail(0), hit.package)
        }
        (QueryKind::Symbols, _) => format!("{} in {} ({})", hit.value, detail(0), hit.package),
        (QueryKind::Packages, _) => hit.package.clone(),
        (QueryKind::Ctags, _) => format!(
            "{} ({} at {}:{}) ({})",
            hit.value,
            detail(0),
            detail(2),
            detail(1),
            hit.package
        ),
        _ => format!("{} ({})", hit.value, hit.package),
    }
}

fn print_extra_info(conn: &Connection, hit: &QueryMatch) -> Result<()> {
    let built = hit
        .build_date
        .parse::<i64>()
        .ok()
        .and_then(|secs| chrono::DateTime::from_timestamp(secs, 0))
        .map(|at| at.format("%a %b %d %H:%M:%S %Y").to_string())
        .unwrap_or_else(|| hit.build_date.clone());
    println!("      built: {}", built);
    if let Some(flags) = hit.flags(conn)? {
        println!(
            "      RELRO: {}  SSP: {}  PIE: {}  FORTIFY: {}  NX: {}",
            flags.relro, flags.ssp, flags.pie, flags.fortify, flags.nx
        );
    }
    Ok(())
}
