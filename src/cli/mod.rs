//! Command-line interface for strmsync.
//!
//! Provides commands for running the sync loop, running a single cycle,
//! inspecting configuration, and summarizing the persisted catalog.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use crate::adapters::{ApolloClient, TmdbClient};
use crate::config::{self, mask_secret, ResolvedConfig};
use crate::core::{CatalogCache, CycleReport, SyncOptions, SyncOrchestrator};
use crate::domain::StreamStatus;

/// strmsync - IPTV playlist to media library synchronizer
#[derive(Parser, Debug)]
#[command(name = "strmsync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sync forever, sleeping the scan interval between cycles (default)
    Run,

    /// Run a single sync cycle and print a summary
    Once {
        /// Print the cycle report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show resolved configuration (secrets masked)
    Config,

    /// Summarize the persisted stream catalog
    Status {
        /// Data directory (defaults to the configured one)
        #[arg(short, long, env = "STRMSYNC_DATA_DIR")]
        data_dir: Option<PathBuf>,
    },
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        match self.command.unwrap_or(Commands::Run) {
            Commands::Run => run_loop().await,
            Commands::Once { json } => run_once(json).await,
            Commands::Config => show_config(),
            Commands::Status { data_dir } => show_status(data_dir).await,
        }
    }
}

/// Build an orchestrator from configuration and persisted state
pub async fn build_orchestrator(cfg: &ResolvedConfig) -> Result<SyncOrchestrator> {
    let cache = CatalogCache::load(&cfg.data_dir)
        .await
        .with_context(|| format!("Failed to load catalog from {}", cfg.data_dir.display()))?;

    let playlists = ApolloClient::new(&cfg.playlist_base_url, &cfg.username, &cfg.password);
    let metadata = TmdbClient::new(&cfg.metadata_base_url, cfg.tmdb_api_key.clone());

    Ok(SyncOrchestrator::new(
        SyncOptions::from_config(cfg),
        cache,
        Arc::new(playlists),
        Arc::new(metadata),
    ))
}

async fn run_loop() -> Result<()> {
    let cfg = config::config()?;
    let mut orchestrator = build_orchestrator(cfg).await?;
    orchestrator.run_forever().await
}

async fn run_once(json: bool) -> Result<()> {
    let cfg = config::config()?;
    let mut orchestrator = build_orchestrator(cfg).await?;
    let report = orchestrator.run_cycle().await?;

    info!(cycle_id = %report.cycle_id, "Cycle complete");

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    Ok(())
}

fn print_report(report: &CycleReport) {
    println!("Cycle {} ({})", report.cycle_number, report.cycle_id);
    println!("  Started:             {}", report.started_at.to_rfc3339());
    println!("  Playlists loaded:    {}", report.playlists_loaded);
    println!("  Parse errors:        {}", report.parse_errors);
    println!(
        "  Streams:             {} ({} new, {} modified)",
        report.merge.total(),
        report.merge.created,
        report.merge.modified
    );
    println!(
        "  Metadata:            {} requested, {} resolved",
        report.metadata_requested, report.metadata_resolved
    );
    println!(
        "  Enrichment:          {} ready, {} faulted, {} unsupported, {} unresolved",
        report.enrichment.ready,
        report.enrichment.faulted,
        report.enrichment.unsupported,
        report.enrichment.unresolved
    );
    println!("  Files written:       {}", report.materialize.written);
    println!("  Notifications:       {}", report.materialize.notifications.len());
    println!("  New faults:          {}", report.new_faults.len());
    println!("  Unit failures:       {}", report.unit_failures);
    println!("  Duration:            {}ms", report.duration_ms);
}

/// Show resolved configuration
fn show_config() -> Result<()> {
    let cfg = config::config()?;

    println!("strmsync configuration");
    println!();
    println!(
        "Config file: {}",
        cfg.config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none - using environment and defaults)".to_string())
    );
    println!();
    println!("Playlist source:");
    println!("  Base URL:  {}", cfg.playlist_base_url);
    println!("  Username:  {}", cfg.username);
    println!("  Password:  {}", mask_secret(&cfg.password));
    println!("  Endpoints: {}", cfg.endpoints().join(", "));
    println!();
    println!("Metadata source:");
    println!("  Base URL:  {}", cfg.metadata_base_url);
    println!(
        "  API key:   {}",
        cfg.tmdb_api_key
            .as_deref()
            .map(mask_secret)
            .unwrap_or_else(|| "(not set)".to_string())
    );
    println!();
    println!("Paths:");
    println!("  Data:      {}", cfg.data_dir.display());
    println!("  Output:    {}", cfg.output_dir.display());
    println!();
    println!("Scheduling:");
    println!("  Interval:          {} minutes", cfg.scan_interval.as_secs() / 60);
    println!("  Fetch concurrency: {}", cfg.fetch_concurrency);
    println!("  Work concurrency:  {}", cfg.work_concurrency);
    println!("  Debug logging:     {}", cfg.debug);

    Ok(())
}

/// Stream counts per status and per media kind
#[derive(Debug, Default, PartialEq, Eq)]
pub struct CatalogSummary {
    pub streams: usize,
    pub by_status: BTreeMap<String, usize>,
    pub by_kind: BTreeMap<String, usize>,
    pub metadata_resolved: usize,
    pub metadata_pending: usize,
}

pub fn summarize(cache: &CatalogCache) -> CatalogSummary {
    let mut summary = CatalogSummary {
        streams: cache.streams.len(),
        ..Default::default()
    };

    for record in cache.streams.values() {
        *summary
            .by_status
            .entry(record.status.as_str().to_string())
            .or_default() += 1;

        let kind = record
            .enrichment
            .as_ref()
            .map(|e| e.media_type.clone())
            .unwrap_or_else(|| "unenriched".to_string());
        *summary.by_kind.entry(kind).or_default() += 1;
    }

    for entry in cache.metadata.values() {
        if entry.is_pending() {
            summary.metadata_pending += 1;
        } else {
            summary.metadata_resolved += 1;
        }
    }

    summary
}

async fn show_status(data_dir: Option<PathBuf>) -> Result<()> {
    let data_dir = match data_dir {
        Some(dir) => dir,
        None => config::config()?.data_dir.clone(),
    };

    let cache = CatalogCache::load(&data_dir).await?;
    if !cache.has_cache() {
        println!("No catalog found in {}", data_dir.display());
        return Ok(());
    }

    let summary = summarize(&cache);

    println!("Catalog: {}", cache.streams_path().display());
    println!("Streams: {}", summary.streams);
    println!();
    println!("{:<12} {:>8}", "STATUS", "COUNT");
    println!("{}", "-".repeat(21));
    for status in [
        StreamStatus::New,
        StreamStatus::Modified,
        StreamStatus::Ready,
        StreamStatus::Exists,
        StreamStatus::Fault,
    ] {
        let count = summary.by_status.get(status.as_str()).copied().unwrap_or(0);
        println!("{:<12} {:>8}", status.as_str(), count);
    }
    println!();
    println!("{:<12} {:>8}", "KIND", "COUNT");
    println!("{}", "-".repeat(21));
    for (kind, count) in &summary.by_kind {
        println!("{:<12} {:>8}", kind, count);
    }
    println!();
    println!(
        "Metadata: {} resolved, {} pending",
        summary.metadata_resolved, summary.metadata_pending
    );

    Ok(())
}
