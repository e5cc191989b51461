//! Core sync logic.
//!
//! This module contains:
//! - Identity: playlist descriptor parsing and stream id derivation
//! - CatalogCache: persisted playlists, streams and metadata
//! - Pools: bounded fetch and work stages
//! - MergeEngine: stream status state machine
//! - Enrichment: metadata merge and output path derivation
//! - Materializer: `.strm` and metadata file writes
//! - FaultLedger: one-time fault reporting
//! - SyncOrchestrator: the per-cycle stage sequence

pub mod cache;
pub mod enrichment;
pub mod fault_ledger;
pub mod identity;
pub mod materializer;
pub mod merge;
pub mod orchestrator;
pub mod pool;

// Re-export commonly used types
pub use cache::CatalogCache;
pub use enrichment::EnrichmentOutcome;
pub use fault_ledger::FaultLedger;
pub use identity::{derive_id, parse, parse_playlist, validate_url, CodecError, ParsedEntry};
pub use materializer::SyncNotification;
pub use merge::{IngestOutcome, MergeEngine, MergeStats};
pub use orchestrator::{CycleReport, EnrichmentStats, MaterializeReport, SyncOptions, SyncOrchestrator};
pub use pool::{Pools, StagePool, UnitOutcome};
