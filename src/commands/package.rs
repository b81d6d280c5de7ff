// src/commands/package.rs

//! Package-level reports and source package examination

use super::Context;
use crate::cli::SxidMode;
use anyhow::Result;
use rq::db::models::{
    BuildRequirement, DependencyEntry, DependencyKind, Package, SourceEntry, SourceKind, SxidFile,
};
use rq::ingest::{ScratchDir, validate_package_file};
use rq::parser::classify_source;
use rq::{PackageInspector, PackageKind, SystemInspector, Tag};
use std::path::Path;

/// Packages of a tag that arrived through `rq update`
pub fn cmd_updates(ctx: &Context, tag_name: &str) -> Result<()> {
    let conn = ctx.open()?;
    let tag = Tag::lookup(&conn, ctx.kind, tag_name)?;
    let updates = Package::find_updates(&conn, tag.id)?;

    if updates.is_empty() {
        println!("No updates recorded for tag '{}'.", tag.name);
        return Ok(());
    }

    println!("Updates in tag '{}' ({}):", tag.name, updates.len());
    for pkg in &updates {
        println!("  {}", pkg.fullname);
    }
    Ok(())
}

/// Setuid or setgid files of a binary tag
pub fn cmd_sxid(ctx: &Context, mode: SxidMode, tag_name: &str) -> Result<()> {
    if ctx.kind != PackageKind::Binary {
        anyhow::bail!("sxid reports are only available for binary packages");
    }

    let conn = ctx.open()?;
    let tag = Tag::lookup(&conn, ctx.kind, tag_name)?;
    let files: Vec<SxidFile> = SxidFile::find_by_tag(&conn, tag.id)?
        .into_iter()
        .filter(|f| match mode {
            SxidMode::Suid => f.is_suid,
            SxidMode::Sgid => f.is_sgid,
        })
        .collect();

    let label = match mode {
        SxidMode::Suid => "setuid",
        SxidMode::Sgid => "setgid",
    };
    if files.is_empty() {
        println!("No {} files in tag '{}'.", label, tag.name);
        return Ok(());
    }

    println!("{} files in tag '{}' ({}):", label, tag.name, files.len());
    for file in &files {
        println!(
            "  {} {:<10} {:<10} {}  ({})",
            file.perms, file.user, file.group, file.path, file.package
        );
    }
    Ok(())
}

/// Everything recorded for packages named `name`
pub fn cmd_show_info(ctx: &Context, name: &str, tag_name: Option<&str>) -> Result<()> {
    let conn = ctx.open()?;
    let tag_id = tag_name
        .map(|t| Tag::lookup(&conn, ctx.kind, t).map(|tag| tag.id))
        .transpose()?;

    let mut shown = 0;
    for pkg in Package::find_by_name(&conn, tag_id, name)? {
        let Some(tag) = Tag::find_by_id(&conn, pkg.tag_id)? else {
            continue;
        };
        if tag.kind != ctx.kind {
            continue;
        }
        let Some(id) = pkg.id else {
            continue;
        };
        shown += 1;

        println!("{} (tag '{}')", pkg.fullname, tag.name);
        println!("  Name:    {}", pkg.name);
        println!("  Version: {}-{}", pkg.version, pkg.release);
        println!("  Arch:    {}", pkg.arch);
        if let Some(source) = &pkg.source_rpm {
            println!("  Source:  {}", source);
        }
        if pkg.is_update {
            println!("  Update:  yes");
        }

        match ctx.kind {
            PackageKind::Source => {
                let sources = SourceEntry::find_by_package(&conn, id)?;
                for (title, kind) in [("Patches", SourceKind::Patch), ("Tarballs", SourceKind::Tarball)] {
                    print_list(
                        title,
                        sources
                            .iter()
                            .filter(|s| s.kind == kind)
                            .map(|s| s.filename.as_str()),
                    );
                }
                let reqs = BuildRequirement::names_for_package(&conn, id)?;
                print_list("Build requirements", reqs.iter().map(String::as_str));
            }
            PackageKind::Binary => {
                let provides = DependencyEntry::names_for_package(&conn, DependencyKind::Provides, id)?;
                print_list("Provides", provides.iter().map(String::as_str));
                let requires = DependencyEntry::names_for_package(&conn, DependencyKind::Requires, id)?;
                print_list("Requires", requires.iter().map(String::as_str));
            }
        }
        println!();
    }

    if shown == 0 {
        anyhow::bail!("No {} package named '{}' found", ctx.kind.label(), name);
    }
    Ok(())
}

fn print_list<'a>(title: &str, items: impl Iterator<Item = &'a str>) {
    let items: Vec<&str> = items.collect();
    if items.is_empty() {
        return;
    }
    println!("  {} ({}):", title, items.len());
    for item in items {
        println!("    {}", item);
    }
}

/// List a source package's members, patch targets and tarball contents
pub fn cmd_examine(ctx: &Context, package: &Path, patches: bool, skip_tar: bool) -> Result<()> {
    validate_package_file(package, PackageKind::Source)?;
    let inspector = SystemInspector::new(&ctx.config)?;
    inspector.ensure_available(PackageKind::Source)?;

    let header = inspector.package_header(package, PackageKind::Source)?;
    println!("{}-{}-{}", header.name, header.version, header.release);

    let listing = inspector.list_files(package)?;
    let scratch = ScratchDir::new("rq-examine-")?;
    inspector.explode(package, scratch.path())?;

    for entry in &listing {
        let member = entry.path.rsplit('/').next().unwrap_or(&entry.path);
        let class = classify_source(member);
        let label = match class.map(|c| c.kind) {
            Some(SourceKind::Patch) => "patch",
            Some(SourceKind::Tarball) => "tarball",
            None => "file",
        };
        println!("  [{}] {}", label, member);

        let path = scratch.path().join(member);
        match class.map(|c| c.kind) {
            Some(SourceKind::Patch) if patches => {
                for target in inspector.list_patch_targets(&path)? {
                    println!("      {}", target);
                }
            }
            Some(SourceKind::Tarball) if !skip_tar => {
                for file in inspector.list_tarball(&path)? {
                    println!("      {}", file);
                }
            }
            _ => {}
        }
    }
    Ok(())
}
