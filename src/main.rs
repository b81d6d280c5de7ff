// src/main.rs

mod cli;
mod commands;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use cli::{Cli, Commands};
use commands::{Context, QueryDisplay};
use rq::{Config, PackageKind};
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

/// `RUST_LOG` wins; otherwise the `-v` count picks the level
fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    if let Commands::Completions { shell } = command {
        clap_complete::generate(shell, &mut Cli::command(), "rq", &mut std::io::stdout());
        return Ok(());
    }

    let config = Config::load(cli.config.as_deref())?;
    let db_path = cli.db_path.unwrap_or_else(|| config.database_path());
    let kind = if cli.source {
        PackageKind::Source
    } else {
        PackageKind::Binary
    };
    let ctx = Context {
        config,
        db_path,
        kind,
    };

    match command {
        Commands::Init => commands::cmd_init(&ctx),
        Commands::AddDirectory {
            tag,
            path,
            update_path,
            progress,
        } => commands::cmd_add_directory(&ctx, &tag, &path, update_path.as_deref(), progress),
        Commands::Add { tag, package } => commands::cmd_add(&ctx, &tag, &package),
        Commands::Update {
            tag,
            list_only,
            progress,
        } => commands::cmd_update(&ctx, &tag, list_only, progress),
        Commands::Delete { tag } => commands::cmd_delete(&ctx, &tag),
        Commands::Tags => commands::cmd_tags(&ctx),
        Commands::Stats { tag } => commands::cmd_stats(&ctx, tag.as_deref()),
        Commands::Updates { tag } => commands::cmd_updates(&ctx, &tag),
        Commands::Sxid { mode, tag } => commands::cmd_sxid(&ctx, mode, &tag),
        Commands::ShowInfo { name, tag } => commands::cmd_show_info(&ctx, &name, tag.as_deref()),
        Commands::Query {
            kind,
            pattern,
            tag,
            regexp,
            count,
            quiet,
            ownership,
            extra_info,
        } => commands::cmd_query(
            &ctx,
            kind,
            &pattern,
            tag.as_deref(),
            regexp,
            QueryDisplay {
                count,
                quiet,
                ownership,
                extra_info,
            },
        ),
        Commands::Examine {
            package,
            patches,
            skip_tar,
        } => commands::cmd_examine(&ctx, &package, patches, skip_tar),
        Commands::Completions { .. } => Ok(()),
    }
}
