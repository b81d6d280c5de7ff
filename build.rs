// build.rs

use clap::{Arg, ArgAction, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

/// Common argument: tag name given with --tag
fn tag_opt() -> Arg {
    Arg::new("tag")
        .short('t')
        .long("tag")
        .value_name("TAG")
        .help("Tag name")
}

/// Common argument: positional tag name
fn tag_arg() -> Arg {
    Arg::new("tag").required(true).help("Tag name")
}

fn flag(name: &'static str, help: &'static str) -> Arg {
    Arg::new(name)
        .long(name)
        .action(ArgAction::SetTrue)
        .help(help)
}

fn build_cli() -> Command {
    Command::new("rq")
        .version(env!("CARGO_PKG_VERSION"))
        .author("rq Contributors")
        .about("Catalog RPM and SRPM package contents and query them")
        .subcommand_required(false)
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .global(true)
                .help("Configuration file (default: /etc/rq.toml, then ~/.config/rq/config.toml)"),
        )
        .arg(
            Arg::new("db_path")
                .short('d')
                .long("db-path")
                .value_name("PATH")
                .global(true)
                .help("Database path (overrides the configuration)"),
        )
        .arg(
            Arg::new("source")
                .short('s')
                .long("source")
                .action(ArgAction::SetTrue)
                .global(true)
                .help("Work on the source package (SRPM) catalog"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::Count)
                .global(true)
                .help("Increase log output (-v for info, -vv for debug)"),
        )
        .subcommand(Command::new("init").about("Initialize the rq database"))
        .subcommand(
            Command::new("add-directory")
                .about("Create a tag and load every package found in a directory")
                .arg(tag_opt().required(true))
                .arg(Arg::new("path").required(true).help("Directory holding the tag's packages"))
                .arg(
                    Arg::new("update_path")
                        .short('u')
                        .long("update-path")
                        .help("Directory scanned for updates instead of the tag directory"),
                )
                .arg(flag("progress", "Show a progress bar")),
        )
        .subcommand(
            Command::new("add")
                .about("Add a single package file to an existing tag")
                .arg(tag_opt().required(true))
                .arg(Arg::new("package").required(true).help("Path to the package file")),
        )
        .subcommand(
            Command::new("update")
                .about("Re-synchronize a tag with its directory")
                .arg(tag_arg())
                .arg(flag("list-only", "Only print what would change").short('l'))
                .arg(flag("progress", "Show a progress bar")),
        )
        .subcommand(
            Command::new("delete")
                .about("Delete a tag and everything recorded under it")
                .arg(tag_arg()),
        )
        .subcommand(Command::new("tags").about("List tags with their package and update counts"))
        .subcommand(
            Command::new("stats")
                .about("Show record counts for one tag or the whole catalog")
                .arg(Arg::new("tag").help("Limit the counts to this tag")),
        )
        .subcommand(
            Command::new("updates")
                .about("List packages that arrived through an update")
                .arg(tag_arg()),
        )
        .subcommand(
            Command::new("sxid")
                .about("List setuid or setgid files in a tag")
                .arg(
                    Arg::new("mode")
                        .required(true)
                        .value_parser(["suid", "sgid"])
                        .help("Which bit to report"),
                )
                .arg(tag_arg()),
        )
        .subcommand(
            Command::new("show-info")
                .about("Show what is recorded for a package name")
                .arg(Arg::new("name").required(true).help("Package name"))
                .arg(tag_opt()),
        )
        .subcommand(
            Command::new("query")
                .about("Search the catalog")
                .arg(
                    Arg::new("kind")
                        .required(true)
                        .value_parser([
                            "files",
                            "provides",
                            "requires",
                            "symbols",
                            "packages",
                            "ctags",
                            "buildreqs",
                        ])
                        .help("What to search"),
                )
                .arg(Arg::new("pattern").required(true).help("Substring, or a regex with --regexp"))
                .arg(tag_opt())
                .arg(flag("regexp", "Treat the pattern as a regular expression").short('r'))
                .arg(flag("count", "Print only the number of matches"))
                .arg(flag("quiet", "Print only the matched values").short('q'))
                .arg(flag("ownership", "Show owner, group and mode of matched files").short('o'))
                .arg(flag("extra-info", "Show build date and hardening flags of matched files").short('e')),
        )
        .subcommand(
            Command::new("examine")
                .about("List the members of a source package without loading it")
                .arg(Arg::new("package").required(true).help("Path to the source package"))
                .arg(flag("patches", "Show the files each patch touches"))
                .arg(flag("skip-tar", "Do not list tarball contents")),
        )
        .subcommand(
            Command::new("completions")
                .about("Generate shell completion scripts")
                .arg(
                    Arg::new("shell")
                        .required(true)
                        .value_parser(["bash", "zsh", "fish", "powershell", "elvish"])
                        .help("Shell type"),
                ),
        )
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    let manifest_dir = match env::var("CARGO_MANIFEST_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(e) => {
            println!("cargo:warning=CARGO_MANIFEST_DIR not set: {}", e);
            return;
        }
    };
    let man_dir = manifest_dir.join("man");

    if let Err(e) = fs::create_dir_all(&man_dir) {
        println!("cargo:warning=Failed to create man directory: {}", e);
        return;
    }

    let man = Man::new(build_cli());
    let mut buffer = Vec::new();

    if let Err(e) = man.render(&mut buffer) {
        println!("cargo:warning=Failed to render man page: {}", e);
        return;
    }

    let man_path = man_dir.join("rq.1");
    if let Err(e) = fs::write(&man_path, buffer) {
        println!("cargo:warning=Failed to write man page: {}", e);
    }
}
