// src/main.rs

use anyhow::Result;
use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use curator::config::Config;
use curator::registry::{DownloadReport, Registry};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser)]
#[command(name = "curator")]
#[command(author, version, about = "Extension package registry with ownership enforcement and download statistics", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Storage selection shared by every registry subcommand
#[derive(Args)]
struct StoreArgs {
    /// Configuration file (JSON)
    #[arg(short, long)]
    config: Option<String>,
    /// Data directory (default: /var/lib/curator)
    #[arg(short, long)]
    data_dir: Option<String>,
    /// Storage backend: file, sqlite, or memory
    #[arg(short, long)]
    storage: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize an empty registry
    Init {
        #[command(flatten)]
        store: StoreArgs,
    },
    /// Publish a package artifact (.tar.gz with a package.json manifest)
    Publish {
        /// Path to the artifact file
        artifact: String,
        /// Identity publishing the artifact
        #[arg(short, long)]
        user: String,
        #[command(flatten)]
        store: StoreArgs,
    },
    /// List registered packages
    List {
        #[command(flatten)]
        store: StoreArgs,
    },
    /// Show one package in detail
    Show {
        /// Package name
        name: String,
        #[command(flatten)]
        store: StoreArgs,
    },
    /// Delete a package's registry entry (stored artifacts are kept)
    Delete {
        /// Package name
        name: String,
        /// Identity requesting the deletion (admin or owner)
        #[arg(short, long)]
        user: String,
        #[command(flatten)]
        store: StoreArgs,
    },
    /// Transfer a package to a new owner
    Chown {
        /// Package name
        name: String,
        /// Identity of the new owner
        new_owner: String,
        /// Identity requesting the transfer (admin or owner)
        #[arg(short, long)]
        user: String,
        #[command(flatten)]
        store: StoreArgs,
    },
    /// Set the host-compatibility range on every version of a package
    SetRequirements {
        /// Package name
        name: String,
        /// Semver range, e.g. ">=2.1.0"
        range: String,
        /// Identity requesting the change (admin or owner)
        #[arg(short, long)]
        user: String,
        #[command(flatten)]
        store: StoreArgs,
    },
    /// Merge a download-statistics report (JSON keyed by package name)
    Ingest {
        /// Path to the report file
        report: String,
        #[command(flatten)]
        store: StoreArgs,
    },
    /// Generate shell completion scripts
    Completions {
        /// Shell type
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Resolve the effective configuration: the config file (or defaults) with
/// command-line overrides applied on top.
fn resolve_config(store: &StoreArgs) -> Result<Config> {
    let mut config = match &store.config {
        Some(path) => Config::load(Path::new(path))?,
        None => Config::default(),
    };
    if let Some(data_dir) = &store.data_dir {
        config.data_dir = PathBuf::from(data_dir);
    }
    if let Some(kind) = &store.storage {
        config.storage = kind.parse()?;
    }
    Ok(config)
}

/// Open and load the registry selected by `store`.
fn open_registry(store: &StoreArgs) -> Result<Registry> {
    let config = resolve_config(store)?;
    let registry = Registry::open(&config)?;
    registry.load()?;
    Ok(registry)
}

fn main() -> Result<()> {
    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Init { store }) => {
            let config = resolve_config(&store)?;
            info!("Initializing registry in: {}", config.data_dir.display());
            let registry = Registry::open(&config)?;
            registry.load()?;
            registry.store().persist()?;
            println!(
                "Registry initialized ({} storage) at: {}",
                config.storage,
                config.data_dir.display()
            );
            Ok(())
        }
        Some(Commands::Publish {
            artifact,
            user,
            store,
        }) => {
            info!("Publishing artifact: {}", artifact);
            let registry = open_registry(&store)?;

            let entry = match registry.publish(Path::new(&artifact), &user) {
                Err(curator::Error::ValidationFailed(issues)) => {
                    println!("Artifact rejected:");
                    for issue in &issues {
                        println!("  - {}", issue);
                    }
                    return Err(curator::Error::ValidationFailed(issues).into());
                }
                other => other?,
            };

            println!(
                "Published {} version {}",
                entry.metadata.name, entry.metadata.version
            );
            println!("  Owner: {}", entry.owner);
            println!("  Versions: {}", entry.versions.len());
            if let Some(engine) = &entry.metadata.engine {
                println!("  Requires host: {}", engine);
            }
            Ok(())
        }
        Some(Commands::List { store }) => {
            let registry = open_registry(&store)?;
            let entries = registry.list()?;

            if entries.is_empty() {
                println!("No packages registered.");
            } else {
                println!("Registered packages:");
                for entry in &entries {
                    print!("  {} {}", entry.metadata.name, entry.metadata.version);
                    if let Some(title) = &entry.metadata.title {
                        print!(" \"{}\"", title);
                    }
                    println!(
                        " - owner {}, {} download(s)",
                        entry.owner, entry.total_downloads
                    );
                }
                println!("\nTotal: {} package(s)", entries.len());
            }
            Ok(())
        }
        Some(Commands::Show { name, store }) => {
            let registry = open_registry(&store)?;
            let entry = registry
                .get(&name)?
                .ok_or_else(|| anyhow::anyhow!("Package '{}' is not registered", name))?;

            println!("{} {}", entry.metadata.name, entry.metadata.version);
            if let Some(title) = &entry.metadata.title {
                println!("  Title: {}", title);
            }
            if let Some(author) = &entry.metadata.author {
                println!("  Author: {}", author);
            }
            if let Some(description) = &entry.metadata.description {
                println!("  Description: {}", description);
            }
            println!("  Owner: {}", entry.owner);
            println!("  Total downloads: {}", entry.total_downloads);
            println!("  Versions:");
            for record in &entry.versions {
                print!("    {} (published {})", record.version, record.published);
                if let Some(engine) = &record.engine {
                    print!(", requires host {}", engine);
                }
                if let Some(downloads) = record.downloads {
                    print!(", {} download(s)", downloads);
                }
                println!();
            }
            if !entry.recent.is_empty() {
                println!("  Recent downloads:");
                for (day, count) in &entry.recent {
                    println!("    {}: {}", day, count);
                }
            }
            Ok(())
        }
        Some(Commands::Delete { name, user, store }) => {
            info!("Deleting registry entry: {}", name);
            let registry = open_registry(&store)?;
            registry.delete_metadata(&name, &user)?;
            println!("Deleted registry entry for: {}", name);
            println!("  Stored artifacts were kept");
            Ok(())
        }
        Some(Commands::Chown {
            name,
            new_owner,
            user,
            store,
        }) => {
            info!("Transferring '{}' to '{}'", name, new_owner);
            let registry = open_registry(&store)?;
            registry.change_owner(&name, &user, &new_owner)?;
            println!("Transferred '{}' to '{}'", name, new_owner);
            Ok(())
        }
        Some(Commands::SetRequirements {
            name,
            range,
            user,
            store,
        }) => {
            let registry = open_registry(&store)?;
            registry.change_requirements(&name, &user, &range)?;
            println!(
                "Set host requirement '{}' on every version of '{}'",
                range, name
            );
            Ok(())
        }
        Some(Commands::Ingest { report, store }) => {
            info!("Ingesting download report: {}", report);
            let registry = open_registry(&store)?;

            let raw = std::fs::read_to_string(&report)?;
            let reports: HashMap<String, DownloadReport> = serde_json::from_str(&raw)?;

            let mut merged = 0;
            let mut unmatched = 0;
            for (name, counts) in &reports {
                if registry.record_downloads(name, &counts.versions, &counts.days)? {
                    merged += 1;
                } else {
                    unmatched += 1;
                }
            }

            println!(
                "Ingested download statistics: {} package(s) updated, {} report(s) unmatched",
                merged, unmatched
            );
            Ok(())
        }
        Some(Commands::Completions { shell }) => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "curator", &mut std::io::stdout());
            Ok(())
        }
        None => {
            // No command provided, show help
            println!("Curator Extension Registry v{}", env!("CARGO_PKG_VERSION"));
            println!("Run 'curator --help' for usage information");
            Ok(())
        }
    }
}
