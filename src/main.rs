//! CLI entry point for the collage layout engine.
//!
//! Reads image references (one per line), runs the acquisition pipeline
//! and layout, and writes the placement list as JSON for a downstream
//! renderer.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use collagrid::{
    CollageEngine, ChatDescriptionClient, HttpFetcher, ImageReference, PredictEmbeddingClient,
    Settings, VectorCache,
};

#[derive(Parser)]
#[command(name = "collagrid", version, about = "Similarity-driven image collage layout")]
struct Cli {
    /// Path to the configuration file
    #[arg(long, default_value = "collagrid.toml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute a grid layout from a file of image references
    Layout {
        /// File with one image URL or path per line
        refs_file: PathBuf,

        /// Write the layout JSON here instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,

        /// Disable cosmetic jitter (fully deterministic output)
        #[arg(long)]
        no_jitter: bool,

        /// Override the cache directory
        #[arg(long)]
        cache_dir: Option<PathBuf>,
    },
}

fn read_references(path: &PathBuf) -> Result<Vec<ImageReference>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read references from '{}'", path.display()))?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(ImageReference::new)
        .collect())
}

async fn run(cli: Cli) -> Result<()> {
    let mut settings = Settings::load_from(&cli.config)?;

    match cli.command {
        Commands::Layout {
            refs_file,
            out,
            no_jitter,
            cache_dir,
        } => {
            if no_jitter {
                settings.jitter.enabled = false;
            }
            if let Some(dir) = cache_dir {
                settings.cache_dir = dir;
            }

            let references = read_references(&refs_file)?;
            let cache = Arc::new(VectorCache::open(&settings.cache_dir)?);
            let fetcher = HttpFetcher::new(&settings.fetch)?;
            let descriptions = ChatDescriptionClient::new(settings.description.clone())?;
            let embeddings = PredictEmbeddingClient::new(settings.embedding.clone())?;

            let engine = CollageEngine::new(fetcher, descriptions, embeddings, cache, settings);
            let layout = engine.layout(&references).await?;

            let json = serde_json::to_string_pretty(&layout)?;
            match out {
                Some(path) => {
                    std::fs::write(&path, json)
                        .with_context(|| format!("failed to write '{}'", path.display()))?;
                    eprintln!(
                        "Wrote {}x{} layout to {}",
                        layout.grid_size,
                        layout.grid_size,
                        path.display()
                    );
                }
                None => println!("{json}"),
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("collagrid=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        // Surface the stable status code when the failure came from the
        // engine, without leaking internal detail.
        if let Some(collage_err) = e.downcast_ref::<collagrid::CollageError>() {
            eprintln!("Error [{}]: {collage_err}", collage_err.status_code());
        } else {
            eprintln!("Error: {e:#}");
        }
        std::process::exit(1);
    }
}
