//! Command-line interface for assetpin.
//!
//! Provides commands for uploading assets, inspecting cached progress, and
//! showing the resolved configuration.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;

use crate::adapters::PinataPublisher;
use crate::config::{load_config, ResolvedConfig};
use crate::core::{
    plan, AssetResolver, AssetStatus, CacheStore, Namespace, Orchestrator, ResultWriter, RunLock,
    SkippedAsset,
};
use crate::domain::AssetState;

/// assetpin - Resumable IPFS publication pipeline for generated assets
#[derive(Parser, Debug)]
#[command(name = "assetpin")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Pin new images and metadata, then write tokenUriMap.json and uploadResults.json
    Upload {
        #[command(flatten)]
        dirs: DirArgs,

        /// Show what would be uploaded without publishing or writing anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Show per-asset progress from the upload caches
    Status {
        #[command(flatten)]
        dirs: DirArgs,
    },

    /// Show resolved configuration (debug)
    Config,
}

/// Directory overrides shared by commands
#[derive(Args, Debug, Clone, Default)]
pub struct DirArgs {
    /// Images directory
    #[arg(long)]
    pub images: Option<PathBuf>,

    /// Drafts directory
    #[arg(long)]
    pub drafts: Option<PathBuf>,

    /// Output directory (caches and run outputs)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl DirArgs {
    fn resolve(self) -> Result<ResolvedConfig> {
        Ok(load_config()?.with_overrides(self.images, self.drafts, self.output))
    }
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Upload { dirs, dry_run } => {
                let config = dirs.resolve()?;
                if dry_run {
                    show_plan(&config, true).await
                } else {
                    upload(&config).await
                }
            }
            Commands::Status { dirs } => {
                let config = dirs.resolve()?;
                show_plan(&config, false).await
            }
            Commands::Config => show_config(),
        }
    }
}

fn build_resolver(config: &ResolvedConfig) -> Result<AssetResolver> {
    AssetResolver::new(&config.images_dir, &config.drafts_dir, &config.payload_glob)
        .with_context(|| format!("Invalid payload glob: {}", config.payload_glob))
}

/// Run the full upload pipeline
async fn upload(config: &ResolvedConfig) -> Result<()> {
    let jwt = config.pinata_jwt()?;
    let publisher = Arc::new(PinataPublisher::with_api_url(jwt, &config.pinata.api_url));

    let _lock = RunLock::acquire(&config.output_dir)?;
    let mut cache = CacheStore::load(&config.output_dir).await?;
    let resolver = build_resolver(config)?;
    let writer = ResultWriter::new(&config.output_dir);

    let orchestrator = Orchestrator::new(publisher, config.collection.clone());
    let report = orchestrator.run(&resolver, &mut cache, &writer).await?;

    println!();
    println!(
        "Done in {:.1}s.",
        report.duration().num_milliseconds() as f64 / 1000.0
    );
    if report.outputs.is_empty() {
        println!("  No assets recorded");
    } else {
        println!(
            "  {} assets recorded ({} new images, {} new metadata)",
            report.outputs.len(),
            report.images_published,
            report.metadata_published
        );
    }
    print_skipped(&report.skipped);
    println!("Saved {} (ID -> tokenURI)", writer.token_uri_map_path().display());
    println!("Saved {} (full details)", writer.results_path().display());

    Ok(())
}

/// Show cached progress; in dry-run mode, phrase it as pending work
async fn show_plan(config: &ResolvedConfig, dry_run: bool) -> Result<()> {
    let cache = CacheStore::load(&config.output_dir).await?;
    let resolver = build_resolver(config)?;

    let (statuses, skipped) = plan(&resolver, &cache).await?;
    info!(assets = statuses.len(), skipped = skipped.len(), "Planned run");

    println!("{:<16} {:<20} {:<50} TOKEN", "ID", "STATE", "IMAGE");
    println!("{}", "-".repeat(110));
    for status in &statuses {
        print_status(status, &config.pinata.gateway_url);
    }

    let pending_images = statuses.iter().filter(|s| s.image.is_none()).count();
    let pending_metadata = statuses.iter().filter(|s| s.token.is_none()).count();

    println!();
    if dry_run {
        println!(
            "Dry run: would upload {} images and {} metadata documents",
            pending_images, pending_metadata
        );
    } else {
        println!(
            "{} assets, {} fully published, {} images cached, {} metadata cached",
            statuses.len(),
            statuses
                .iter()
                .filter(|s| s.state == AssetState::MetadataPublished)
                .count(),
            cache.len(Namespace::Images),
            cache.len(Namespace::Metadata)
        );
    }
    print_skipped(&skipped);

    Ok(())
}

fn print_status(status: &AssetStatus, gateway: &str) {
    let image = status
        .image
        .as_ref()
        .map(|r| r.to_string())
        .unwrap_or_else(|| "-".to_string());
    let token = status
        .token
        .as_ref()
        .map(|r| r.gateway_url(gateway))
        .unwrap_or_else(|| "-".to_string());

    println!(
        "{:<16} {:<20} {:<50} {}",
        status.asset.id,
        status.state.label(),
        image,
        token
    );
}

fn print_skipped(skipped: &[SkippedAsset]) {
    if skipped.is_empty() {
        return;
    }

    println!("Skipped {} file(s):", skipped.len());
    for skip in skipped {
        println!("  {}: {}", skip.file_name, skip.reason);
    }
}

/// Show resolved configuration
fn show_config() -> Result<()> {
    let config = load_config()?;

    println!("assetpin Configuration");
    println!("======================");
    println!();
    match &config.config_file {
        Some(path) => println!("Config file: {}", path.display()),
        None => println!("Config file: (none, using defaults)"),
    }
    println!("Images:      {}", config.images_dir.display());
    println!("Drafts:      {}", config.drafts_dir.display());
    println!("Output:      {}", config.output_dir.display());
    println!("Payloads:    {}", config.payload_glob);
    println!();
    println!("Pinata API:  {}", config.pinata.api_url);
    println!("Gateway:     {}", config.pinata.gateway_url);
    println!(
        "JWT:         {}",
        if config.pinata_jwt().is_ok() { "set" } else { "missing" }
    );
    println!();
    println!("Collection:  {}", config.collection.name);
    println!(
        "Label:       {}: {}",
        config.collection.network_trait_type, config.collection.network_label
    );

    Ok(())
}
