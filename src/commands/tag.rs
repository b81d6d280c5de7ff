// src/commands/tag.rs

//! Tag maintenance commands: create, load, update, delete, list, stats

use super::{Context, format_size, progress_for};
use anyhow::{Context as _, Result};
use rq::db::models::TagStats;
use rq::{AddOutcome, PackageIngestor, PackageKind, SystemInspector, Tag, TagReconciler};
use std::path::Path;
use tracing::info;

/// Create the database
pub fn cmd_init(ctx: &Context) -> Result<()> {
    info!("Initializing rq database at: {}", ctx.db_path);
    rq::db::init(&ctx.db_path)?;
    println!("Database initialized successfully at: {}", ctx.db_path);
    Ok(())
}

/// Create `tag_name` for `path` and load every package in it
pub fn cmd_add_directory(
    ctx: &Context,
    tag_name: &str,
    path: &Path,
    update_path: Option<&Path>,
    show_progress: bool,
) -> Result<()> {
    let path = absolute_dir(path)?;
    let update_path = update_path.map(absolute_dir).transpose()?;

    let mut conn = ctx.open()?;
    let inspector = SystemInspector::new(&ctx.config)?;
    inspector.ensure_available(ctx.kind)?;

    let tag = Tag::create(
        &conn,
        ctx.kind,
        tag_name,
        &path,
        update_path.as_deref(),
    )?;
    println!("Created {} tag '{}' for {}", ctx.kind, tag.name, tag.path);

    let progress = progress_for("Adding", show_progress);
    let mut ingestor = PackageIngestor::new(&inspector, ctx.kind);
    let summary = ingestor.add_directory(&mut conn, &tag, Path::new(&tag.path), progress.as_ref())?;

    for (file, reason) in &summary.failures {
        println!("  [FAILED] {}: {}", file, reason);
    }
    println!("Tag '{}': {}", tag.name, summary);
    Ok(())
}

/// Add one package file to an existing tag
pub fn cmd_add(ctx: &Context, tag_name: &str, package: &Path) -> Result<()> {
    let mut conn = ctx.open()?;
    let tag = Tag::lookup(&conn, ctx.kind, tag_name)?;
    let inspector = SystemInspector::new(&ctx.config)?;
    inspector.ensure_available(ctx.kind)?;

    let mut ingestor = PackageIngestor::new(&inspector, ctx.kind);
    match ingestor.add_package(&mut conn, &tag, package, false)? {
        outcome @ AddOutcome::Added(_) => println!("{}", outcome),
        AddOutcome::Skipped { reason } => println!("Skipped: {}", reason),
        AddOutcome::Failed { reason } => {
            anyhow::bail!("Failed to add {}: {}", package.display(), reason)
        }
    }
    Ok(())
}

/// Re-synchronize a tag with its directory, or only print the plan
pub fn cmd_update(ctx: &Context, tag_name: &str, list_only: bool, show_progress: bool) -> Result<()> {
    let mut conn = ctx.open()?;
    let mut tag = Tag::lookup(&conn, ctx.kind, tag_name)?;
    let inspector = SystemInspector::new(&ctx.config)?;
    inspector.ensure_available(ctx.kind)?;
    let reconciler = TagReconciler::new(&inspector);

    let plan = reconciler.plan(&conn, &tag)?;
    for (file, reason) in &plan.unreadable {
        println!("  [UNREADABLE] {}: {}", file, reason);
    }

    if list_only {
        println!("{}", plan);
        return Ok(());
    }

    if plan.is_empty() && plan.seen.is_empty() {
        println!("No changes detected.");
        return Ok(());
    }

    let progress = progress_for("Updating", show_progress);
    let outcome = reconciler.commit(&mut conn, &mut tag, &plan, progress.as_ref())?;
    for (file, reason) in &outcome.additions.failures {
        println!("  [FAILED] {}: {}", file, reason);
    }
    println!("Tag '{}': {}", tag.name, outcome);
    Ok(())
}

/// Delete a tag and all of its records
pub fn cmd_delete(ctx: &Context, tag_name: &str) -> Result<()> {
    let mut conn = ctx.open()?;
    let tag = Tag::lookup(&conn, ctx.kind, tag_name)?;

    let packages = rq::db::transaction(&mut conn, |tx| Tag::delete(tx, tag.id))?;
    println!("Deleted tag '{}' ({} packages)", tag.name, packages);
    Ok(())
}

/// List the tags of the selected catalog
pub fn cmd_tags(ctx: &Context) -> Result<()> {
    let conn = ctx.open()?;
    let tags = Tag::list(&conn, ctx.kind)?;

    if tags.is_empty() {
        println!("No {} tags defined.", ctx.kind);
        println!("\nUse 'rq add-directory --tag <name> <path>' to create one.");
        return Ok(());
    }

    println!("{} tags ({}):", ctx.kind.label(), tags.len());
    for summary in &tags {
        let tag = &summary.tag;
        println!(
            "  {:<20} {:>6} packages {:>6} updates",
            tag.name, summary.package_count, summary.update_count
        );
        println!("      path:     {}", tag.path);
        if let Some(update_path) = &tag.update_path {
            println!("      updates:  {}", update_path);
        }
        println!("      created:  {}", tag.created_at);
        println!(
            "      updated:  {}",
            tag.updated_at.as_deref().unwrap_or("never")
        );
    }
    Ok(())
}

/// Record counts for one tag or every tag of the selected catalog
pub fn cmd_stats(ctx: &Context, tag_name: Option<&str>) -> Result<()> {
    let conn = ctx.open()?;
    let tag = tag_name
        .map(|name| Tag::lookup(&conn, ctx.kind, name))
        .transpose()?;
    let stats = Tag::stats(&conn, ctx.kind, tag.as_ref().map(|t| t.id))?;

    match &tag {
        Some(tag) => println!("Statistics for tag '{}':", tag.name),
        None => println!("Statistics for all {} tags:", ctx.kind),
    }
    print_stats(&stats, ctx.kind);

    let size = std::fs::metadata(&ctx.db_path)
        .with_context(|| format!("Cannot stat database {}", ctx.db_path))?
        .len();
    println!("  {:<22} {}", "Database size:", format_size(size));
    Ok(())
}

fn print_stats(stats: &TagStats, kind: PackageKind) {
    let mut rows = vec![("Tags", stats.tags), ("Packages", stats.packages)];
    match kind {
        PackageKind::Binary => rows.extend([
            ("Files", stats.files),
            ("Provides", stats.provides),
            ("Requires", stats.requires),
            ("Symbols", stats.symbols),
            ("ELF flag records", stats.flags),
        ]),
        PackageKind::Source => rows.extend([
            ("Sources", stats.sources),
            ("Source files", stats.source_files),
            ("Ctags", stats.ctags),
            ("Build requirements", stats.buildreqs),
        ]),
    }
    rows.push(("Superseded files", stats.already_seen));

    for (label, count) in rows {
        println!("  {:<22} {}", format!("{}:", label), count);
    }
}

/// Canonical directory path as a string; the directory must exist
fn absolute_dir(path: &Path) -> Result<String> {
    if !path.is_dir() {
        return Err(rq::Error::ValidationError(format!(
            "Path ({}) is not a valid directory",
            path.display()
        ))
        .into());
    }
    let path = std::fs::canonicalize(path)
        .with_context(|| format!("Cannot resolve {}", path.display()))?;
    Ok(path.to_string_lossy().into_owned())
}
