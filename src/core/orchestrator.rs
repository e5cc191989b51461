//! Sync cycle orchestrator.
//!
//! Runs the fixed stage sequence once per cycle:
//!
//! ```text
//! fetch playlists   (fetch pool)  -> save playlists
//! parse + merge     (work pool)   -> save streams, metadata
//! fetch metadata    (fetch pool)  -> save metadata
//! merge enrichment  (work pool)   -> save streams
//! plan directories
//! write files       (work pool)   -> save streams
//! reconcile fault ledger
//! ```
//!
//! Units never touch the catalog. They return values to the stage driver,
//! which is the only writer, so no locks are needed.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::adapters::{MetadataSource, PlaylistSource};
use crate::config::ResolvedConfig;
use crate::domain::{EnrichmentEntry, MediaMetadata, StreamRecord, StreamStatus};

use super::cache::CatalogCache;
use super::enrichment::{self, EnrichmentOutcome};
use super::fault_ledger::FaultLedger;
use super::identity::{parse_playlist, CodecError, ParsedEntry};
use super::materializer::{self, SyncNotification, WrittenRecord};
use super::merge::{MergeEngine, MergeStats};
use super::pool::{collect_successes, Pools};

/// Static settings for the orchestrator
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Playlist endpoints in fetch order
    pub endpoints: Vec<String>,
    /// Root of the `media/` tree
    pub output_dir: PathBuf,
    /// Pause between cycles in [`SyncOrchestrator::run_forever`]
    pub scan_interval: Duration,
    pub fetch_concurrency: usize,
    pub work_concurrency: usize,
}

impl SyncOptions {
    pub fn from_config(config: &ResolvedConfig) -> Self {
        Self {
            endpoints: config.endpoints(),
            output_dir: config.output_dir.clone(),
            scan_interval: config.scan_interval,
            fetch_concurrency: config.fetch_concurrency,
            work_concurrency: config.work_concurrency,
        }
    }
}

/// Counts from the enrichment stage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EnrichmentStats {
    pub eligible: usize,
    pub ready: usize,
    pub faulted: usize,
    pub unsupported: usize,
    pub unresolved: usize,
}

/// Result of the directory and file write stages
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MaterializeReport {
    pub directories: usize,
    pub written: usize,
    pub pointers_skipped: usize,
    pub notifications: Vec<SyncNotification>,
}

/// Summary of one sync cycle
#[derive(Debug, Clone, Default, Serialize)]
pub struct CycleReport {
    pub cycle_number: u64,
    pub cycle_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub playlists_loaded: usize,
    pub parse_errors: usize,
    pub merge: MergeStats,
    pub metadata_requested: usize,
    pub metadata_resolved: usize,
    pub enrichment: EnrichmentStats,
    pub materialize: MaterializeReport,
    /// Fault ids reported for the first time this cycle
    pub new_faults: Vec<String>,
    /// Units that failed or panicked, across all stages
    pub unit_failures: usize,
    pub duration_ms: u64,
}

/// Main sync orchestrator
pub struct SyncOrchestrator {
    options: SyncOptions,
    playlist_source: Arc<dyn PlaylistSource>,
    metadata_source: Arc<dyn MetadataSource>,
    pools: Pools,
    cache: CatalogCache,
    ledger: FaultLedger,
    cycle_number: u64,
}

impl SyncOrchestrator {
    pub fn new(
        options: SyncOptions,
        cache: CatalogCache,
        playlist_source: Arc<dyn PlaylistSource>,
        metadata_source: Arc<dyn MetadataSource>,
    ) -> Self {
        let pools = Pools::new(options.fetch_concurrency, options.work_concurrency);

        Self {
            options,
            playlist_source,
            metadata_source,
            pools,
            cache,
            ledger: FaultLedger::new(),
            cycle_number: 0,
        }
    }

    pub fn cache(&self) -> &CatalogCache {
        &self.cache
    }

    pub fn ledger(&self) -> &FaultLedger {
        &self.ledger
    }

    /// Number of cycles started so far
    pub fn cycle_number(&self) -> u64 {
        self.cycle_number
    }

    /// Run cycles until the process is stopped
    pub async fn run_forever(&mut self) -> Result<()> {
        info!(
            source = self.playlist_source.name(),
            metadata = self.metadata_source.name(),
            interval_secs = self.options.scan_interval.as_secs(),
            "Starting sync loop"
        );

        loop {
            match self.run_cycle().await {
                Ok(report) => info!(
                    cycle = report.cycle_number,
                    duration_ms = report.duration_ms,
                    notifications = report.materialize.notifications.len(),
                    unit_failures = report.unit_failures,
                    "Sync cycle completed"
                ),
                Err(e) => error!(error = %format!("{:#}", e), "Sync cycle failed"),
            }

            debug!(secs = self.options.scan_interval.as_secs(), "Sleeping until next cycle");
            tokio::time::sleep(self.options.scan_interval).await;
        }
    }

    /// Run one full cycle.
    ///
    /// Unit failures are logged and counted. Only persistence failures abort
    /// the cycle.
    pub async fn run_cycle(&mut self) -> Result<CycleReport> {
        self.cycle_number += 1;
        self.execute_cycle(self.cycle_number, Uuid::new_v4()).await
    }

    #[instrument(name = "cycle", skip_all, fields(cycle = cycle_number, cycle_id = %cycle_id))]
    async fn execute_cycle(&mut self, cycle_number: u64, cycle_id: Uuid) -> Result<CycleReport> {
        let started = Instant::now();
        info!("Starting sync cycle");

        let mut report = CycleReport {
            cycle_number,
            cycle_id,
            started_at: Utc::now(),
            ..Default::default()
        };

        self.fetch_playlists(&mut report).await?;
        self.parse_playlists(&mut report).await?;
        self.fetch_metadata(&mut report).await?;
        self.merge_enrichment(&mut report).await?;
        self.materialize(&mut report).await?;

        report.new_faults = self.ledger.reconcile(&self.cache.streams);
        report.duration_ms = started.elapsed().as_millis() as u64;

        info!(
            duration_ms = report.duration_ms,
            streams = self.cache.streams.len(),
            new_faults = report.new_faults.len(),
            "Sync cycle finished"
        );

        Ok(report)
    }

    async fn fetch_playlists(&mut self, report: &mut CycleReport) -> Result<()> {
        let started = Instant::now();
        let source = Arc::clone(&self.playlist_source);
        let items = self
            .options
            .endpoints
            .iter()
            .map(|endpoint| (endpoint.clone(), endpoint.clone()))
            .collect();

        let outcomes = self
            .pools
            .fetch
            .run_all(items, move |endpoint: String| {
                let source = Arc::clone(&source);
                async move {
                    let body = source.fetch_playlist(&endpoint).await?;
                    Ok::<_, anyhow::Error>(body.split('\n').map(String::from).collect::<Vec<_>>())
                }
            })
            .await;

        let (fetched, failures) = collect_successes("fetch_playlists", outcomes);
        report.unit_failures += failures;
        report.playlists_loaded = fetched.len();

        // Failed endpoints keep their previously cached lines
        for (endpoint, lines) in fetched {
            self.cache.playlists.insert(endpoint, lines);
        }
        let endpoints = &self.options.endpoints;
        self.cache
            .playlists
            .retain(|endpoint, _| endpoints.contains(endpoint));
        self.cache.save_playlists().await?;

        info!(
            lists = report.playlists_loaded,
            failed = failures,
            duration_ms = started.elapsed().as_millis() as u64,
            "Loaded playlists"
        );
        Ok(())
    }

    async fn parse_playlists(&mut self, report: &mut CycleReport) -> Result<()> {
        let started = Instant::now();
        // Configured order decides which sighting of a duplicate id wins
        let items = self
            .options
            .endpoints
            .iter()
            .filter_map(|endpoint| {
                self.cache
                    .playlists
                    .get(endpoint)
                    .map(|lines| (endpoint.clone(), lines.clone()))
            })
            .collect();

        let outcomes = self
            .pools
            .work
            .run_all(items, |lines: Vec<String>| async move {
                Ok::<(Vec<ParsedEntry>, Vec<CodecError>), anyhow::Error>(parse_playlist(&lines))
            })
            .await;

        let (parsed, failures) = collect_successes("parse_playlists", outcomes);
        report.unit_failures += failures;

        let mut engine = MergeEngine::new(&mut self.cache);
        for (endpoint, (entries, errors)) in parsed {
            for error in &errors {
                warn!(%endpoint, %error, "Skipped playlist entry");
            }
            report.parse_errors += errors.len();

            for entry in entries {
                engine.ingest(entry);
            }
        }
        report.merge = engine.finish();

        self.cache.save_streams().await?;
        self.cache.save_metadata().await?;

        info!(
            streams = report.merge.total(),
            created = report.merge.created,
            modified = report.merge.modified,
            duplicates = report.merge.duplicates,
            parse_errors = report.parse_errors,
            duration_ms = started.elapsed().as_millis() as u64,
            "Parsed playlists"
        );
        Ok(())
    }

    async fn fetch_metadata(&mut self, report: &mut CycleReport) -> Result<()> {
        let started = Instant::now();
        let source = Arc::clone(&self.metadata_source);
        let items: Vec<(String, String)> = self
            .cache
            .pending_metadata()
            .into_iter()
            .map(|imdb_id| (imdb_id.clone(), imdb_id))
            .collect();
        report.metadata_requested = items.len();

        let outcomes = self
            .pools
            .fetch
            .run_all(items, move |imdb_id: String| {
                let source = Arc::clone(&source);
                async move { source.find_by_imdb_id(&imdb_id).await }
            })
            .await;

        let (fetched, failures) = collect_successes("fetch_metadata", outcomes);
        report.unit_failures += failures;

        for (imdb_id, metadata) in fetched {
            match metadata {
                Some(metadata) => {
                    self.cache
                        .metadata
                        .insert(imdb_id, EnrichmentEntry::Resolved(metadata));
                    report.metadata_resolved += 1;
                }
                None => debug!(%imdb_id, "No metadata available"),
            }
        }
        self.cache.save_metadata().await?;

        info!(
            requested = report.metadata_requested,
            resolved = report.metadata_resolved,
            duration_ms = started.elapsed().as_millis() as u64,
            "Loaded metadata"
        );
        Ok(())
    }

    async fn merge_enrichment(&mut self, report: &mut CycleReport) -> Result<()> {
        let started = Instant::now();
        let items: Vec<(String, (StreamRecord, Option<EnrichmentEntry>))> = self
            .cache
            .streams
            .values()
            .filter(|record| enrichment::is_eligible(record))
            .map(|record| {
                let entry = record
                    .imdb_id()
                    .and_then(|imdb_id| self.cache.metadata.get(imdb_id))
                    .cloned();
                (record.id.clone(), (record.clone(), entry))
            })
            .collect();
        report.enrichment.eligible = items.len();

        let outcomes = self
            .pools
            .work
            .run_all(items, |(mut record, entry): (StreamRecord, Option<EnrichmentEntry>)| async move {
                let outcome = enrichment::merge(&mut record, entry.as_ref())?;
                Ok::<_, anyhow::Error>((record, outcome))
            })
            .await;

        let (merged, failures) = collect_successes("merge_enrichment", outcomes);
        report.unit_failures += failures;

        for (id, (record, outcome)) in merged {
            let stats = &mut report.enrichment;
            match outcome {
                EnrichmentOutcome::Unresolved => stats.unresolved += 1,
                EnrichmentOutcome::Unsupported { .. } => stats.unsupported += 1,
                EnrichmentOutcome::Fault => {
                    stats.faulted += 1;
                    self.cache.streams.insert(id, record);
                }
                EnrichmentOutcome::Ready => {
                    stats.ready += 1;
                    self.cache.streams.insert(id, record);
                }
            }
        }
        self.cache.save_streams().await?;

        info!(
            eligible = report.enrichment.eligible,
            ready = report.enrichment.ready,
            faulted = report.enrichment.faulted,
            duration_ms = started.elapsed().as_millis() as u64,
            "Merged metadata"
        );
        Ok(())
    }

    async fn materialize(&mut self, report: &mut CycleReport) -> Result<()> {
        let started = Instant::now();
        let output_dir = self.options.output_dir.clone();

        let directories = materializer::plan_directories(&self.cache.streams);
        match materializer::prepare_directories(&output_dir, &directories).await {
            Ok(count) => report.materialize.directories = count,
            Err(e) => error!(error = %format!("{:#}", e), "Failed to prepare directories"),
        }

        // First cycle of a fresh install imports silently
        let notify = self.cache.has_cache() || self.cycle_number > 1;

        let items: Vec<(String, (StreamRecord, Option<MediaMetadata>))> = self
            .cache
            .streams
            .values()
            .filter(|record| materializer::is_ready(record))
            .map(|record| {
                let metadata = record
                    .imdb_id()
                    .and_then(|imdb_id| self.cache.metadata.get(imdb_id))
                    .and_then(EnrichmentEntry::resolved)
                    .cloned();
                (record.id.clone(), (record.clone(), metadata))
            })
            .collect();

        let outcomes = self
            .pools
            .work
            .run_all(items, move |(record, metadata): (StreamRecord, Option<MediaMetadata>)| {
                materializer::write_record(output_dir.clone(), record, metadata, notify)
            })
            .await;

        let (written, failures) = collect_successes("write_files", outcomes);
        report.unit_failures += failures;

        for (id, WrittenRecord { pointer_written, notification }) in written {
            if let Some(record) = self.cache.streams.get_mut(&id) {
                record.status = StreamStatus::Exists;
            }
            report.materialize.written += 1;
            if !pointer_written {
                report.materialize.pointers_skipped += 1;
            }
            if let Some(notification) = notification {
                info!(stream_id = %id, "{}", notification);
                report.materialize.notifications.push(notification);
            }
        }
        self.cache.save_streams().await?;

        info!(
            directories = report.materialize.directories,
            written = report.materialize.written,
            notifications = report.materialize.notifications.len(),
            duration_ms = started.elapsed().as_millis() as u64,
            "Wrote stream files"
        );
        Ok(())
    }
}
