// src/main.rs

use anyhow::Result;
use clap::{Parser, Subcommand};
use repomux::{RepoSelection, RepositoryManager, RepositoryRegistry};
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "repomux")]
#[command(author, version, about = "Parse distribution package metadata into normalized records", long_about = None)]
struct Cli {
    /// Repository definitions file (TOML); built-in definitions if omitted
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List defined repositories
    List,
    /// Parse repositories and print one JSON record per line
    Parse {
        /// Directory holding one subdirectory per repository
        #[arg(short, long, default_value = ".")]
        repos_dir: PathBuf,
        /// Parse every defined repository
        #[arg(short, long, conflicts_with = "repos")]
        all: bool,
        /// Repository names or tags
        #[arg(required_unless_present = "all")]
        repos: Vec<String>,
    },
}

fn load_registry(config: Option<&PathBuf>) -> Result<RepositoryRegistry> {
    match config {
        Some(path) => {
            info!("Loading repository definitions from {}", path.display());
            Ok(RepositoryRegistry::load(path)?)
        }
        None => Ok(RepositoryRegistry::builtin()),
    }
}

fn main() -> Result<()> {
    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let registry = load_registry(cli.config.as_ref())?;

    match cli.command {
        Commands::List => {
            for definition in registry.definitions() {
                let sources: Vec<&str> = definition
                    .sources
                    .iter()
                    .map(|source| source.path.as_str())
                    .collect();
                println!(
                    "{}\t{}\t{}\t[{}]",
                    definition.name,
                    definition.family,
                    sources.join(","),
                    definition.tags.join(",")
                );
            }
            Ok(())
        }
        Commands::Parse {
            repos_dir,
            all,
            repos,
        } => {
            let selection = if all {
                RepoSelection::All
            } else {
                RepoSelection::Names(repos)
            };

            let manager = RepositoryManager::new(repos_dir, registry);
            let report = manager.parse(&selection)?;

            let stdout = io::stdout();
            let mut out = BufWriter::new(stdout.lock());
            for pkg in &report.packages {
                serde_json::to_writer(&mut out, pkg)?;
                writeln!(out)?;
            }
            out.flush()?;

            if !report.diagnostics.is_empty() {
                warn!(
                    "{} units or sources could not be parsed",
                    report.diagnostics.len()
                );
            }
            info!("Printed {} packages", report.packages.len());
            Ok(())
        }
    }
}
