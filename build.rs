// build.rs

use clap::{Arg, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

/// Storage selection args shared by every registry subcommand.
fn store_args(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("config")
            .short('c')
            .long("config")
            .value_name("PATH")
            .help("Configuration file (JSON)"),
    )
    .arg(
        Arg::new("data_dir")
            .short('d')
            .long("data-dir")
            .value_name("DIR")
            .help("Data directory (default: /var/lib/curator)"),
    )
    .arg(
        Arg::new("storage")
            .short('s')
            .long("storage")
            .value_parser(["file", "sqlite", "memory"])
            .help("Storage backend"),
    )
}

fn build_cli() -> Command {
    Command::new("curator")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Curator Contributors")
        .about("Extension package registry with ownership enforcement and download statistics")
        .subcommand_required(false)
        .subcommand(store_args(
            Command::new("init").about("Initialize an empty registry"),
        ))
        .subcommand(store_args(
            Command::new("publish")
                .about("Publish a package artifact (.tar.gz with a package.json manifest)")
                .arg(
                    Arg::new("artifact")
                        .required(true)
                        .help("Path to the artifact file"),
                )
                .arg(
                    Arg::new("user")
                        .short('u')
                        .long("user")
                        .required(true)
                        .help("Identity publishing the artifact"),
                ),
        ))
        .subcommand(store_args(
            Command::new("list").about("List registered packages"),
        ))
        .subcommand(store_args(
            Command::new("show")
                .about("Show one package in detail")
                .arg(Arg::new("name").required(true).help("Package name")),
        ))
        .subcommand(store_args(
            Command::new("delete")
                .about("Delete a package's registry entry (stored artifacts are kept)")
                .arg(Arg::new("name").required(true).help("Package name"))
                .arg(
                    Arg::new("user")
                        .short('u')
                        .long("user")
                        .required(true)
                        .help("Identity requesting the deletion (admin or owner)"),
                ),
        ))
        .subcommand(store_args(
            Command::new("chown")
                .about("Transfer a package to a new owner")
                .arg(Arg::new("name").required(true).help("Package name"))
                .arg(
                    Arg::new("new_owner")
                        .required(true)
                        .help("Identity of the new owner"),
                )
                .arg(
                    Arg::new("user")
                        .short('u')
                        .long("user")
                        .required(true)
                        .help("Identity requesting the transfer (admin or owner)"),
                ),
        ))
        .subcommand(store_args(
            Command::new("set-requirements")
                .about("Set the host-compatibility range on every version of a package")
                .arg(Arg::new("name").required(true).help("Package name"))
                .arg(
                    Arg::new("range")
                        .required(true)
                        .help("Semver range, e.g. \">=2.1.0\""),
                )
                .arg(
                    Arg::new("user")
                        .short('u')
                        .long("user")
                        .required(true)
                        .help("Identity requesting the change (admin or owner)"),
                ),
        ))
        .subcommand(store_args(
            Command::new("ingest")
                .about("Merge a download-statistics report (JSON keyed by package name)")
                .arg(
                    Arg::new("report")
                        .required(true)
                        .help("Path to the report file"),
                ),
        ))
        .subcommand(
            Command::new("completions")
                .about("Generate shell completion scripts")
                .arg(
                    Arg::new("shell")
                        .required(true)
                        .value_parser(["bash", "elvish", "fish", "powershell", "zsh"])
                        .help("Shell type"),
                ),
        )
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // Create man directory
    let out_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap());
    let man_dir = out_dir.join("man");
    fs::create_dir_all(&man_dir).expect("Failed to create man directory");

    // Generate main man page
    let cmd = build_cli();
    let man = Man::new(cmd);
    let mut buffer = Vec::new();
    man.render(&mut buffer).expect("Failed to render man page");

    let man_path = man_dir.join("curator.1");
    fs::write(&man_path, buffer).expect("Failed to write man page");

    println!("cargo:warning=Man page generated at {}", man_path.display());
}
