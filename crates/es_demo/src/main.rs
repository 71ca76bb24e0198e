//! Command-line consumer of the packed entity store.
//!
//! `basic` walks through registering components, writing values and
//! round-tripping an entity through the binary format. `bench` moves a
//! population of entities by their velocity for a number of passes.

mod basic;
mod bench;

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use es_storage::{Storage, StorageConfig};
use tracing::info;

#[derive(Parser)]
#[command(name = "es_demo", about = "Packed entity/component store demo")]
struct Args {
    /// JSON file with storage settings
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Set, serialize and restore a single entity
    Basic,
    /// Integrate position by velocity across many entities
    Bench {
        /// Number of entities to create
        #[arg(short, long, default_value_t = 100_000)]
        entities: u32,

        /// Number of update passes
        #[arg(short, long, default_value_t = 100)]
        iterations: u32,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => StorageConfig::default(),
    };
    info!(
        offset_cache_window = config.offset_cache_window,
        entity_capacity = config.entity_capacity,
        "storage configuration"
    );
    let storage = Storage::with_config(config)?;

    match args.command {
        Command::Basic => basic::run(storage),
        Command::Bench {
            entities,
            iterations,
        } => bench::run(storage, entities, iterations),
    }
}

fn load_config(path: &Path) -> anyhow::Result<StorageConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let config = serde_json::from_str(&text)
        .with_context(|| format!("parsing config {}", path.display()))?;
    Ok(config)
}
