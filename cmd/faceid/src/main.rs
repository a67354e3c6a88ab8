//! faceid CLI - manage known faces and identify people in photos.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

use config::CliConfig;

/// faceid CLI - match faces against a registry of known people.
///
/// Known faces are photos in a local directory or a remote bucket, one per
/// person, named after the person. Faces are encoded by an external
/// encoding service and matched by Euclidean distance.
///
/// Configuration is read from ~/.faceid/config.yaml; FACEID_* environment
/// variables override it.
#[derive(Parser)]
#[command(name = "faceid")]
#[command(about = "Face identity matching CLI")]
#[command(version)]
pub struct Cli {
    /// Config file (default is ~/.faceid/config.yaml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Output as JSON (for piping)
    #[arg(long, global = true)]
    pub json: bool,

    /// Verbose output
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List known identities
    List,
    /// Register a person from a photo
    Add {
        /// Identity name
        name: String,
        /// Photo with the person's face (JPEG or PNG)
        photo: PathBuf,
    },
    /// Identify every face in a photo
    Identify {
        /// Photo to identify (JPEG or PNG)
        photo: PathBuf,
    },
    /// Match a precomputed encoding (JSON array of numbers)
    Match {
        /// Path to the encoding file
        encoding: PathBuf,
    },
    /// Rebuild the registry and cache from the known-faces store
    Rebuild,
    /// Inspect the encoding cache
    Cache {
        #[command(subcommand)]
        command: CacheCommand,
    },
}

#[derive(Subcommand)]
pub enum CacheCommand {
    /// Report a cache's contents and whether the configured encoder accepts it
    Verify {
        /// Cache file (default: cache_path from the config)
        path: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let mut cfg = CliConfig::load(cli.config.as_deref())?;
    cfg.apply_env(|k| std::env::var(k).ok())?;

    commands::run(&cli, &cfg).await
}
