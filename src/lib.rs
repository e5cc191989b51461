//! strmsync - IPTV playlist to media library synchronizer
//!
//! Periodically pulls extended-M3U playlists, enriches every entry with TMDB
//! metadata, and materializes a media-center tree of `.strm` pointer files.
//!
//! # Architecture
//!
//! Each cycle is a fixed sequence of barrier stages:
//! - Playlists are fetched and cached
//! - Entries are parsed into stream records with stable ids
//! - Missing metadata is looked up
//! - Metadata is merged into records awaiting enrichment
//! - Ready records are written to disk
//!
//! Catalog state is persisted after every stage, so a restart resumes from
//! the last completed stage's output.
//!
//! # Modules
//!
//! - `adapters`: External services (playlist source, TMDB)
//! - `core`: Sync pipeline (identity, cache, merge, enrichment, materializer)
//! - `domain`: Data structures (StreamRecord, MediaMetadata)
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Sync forever
//! AGTV_USERNAME=me AGTV_PASSWORD=secret TMDB_API_KEY=token strmsync run
//!
//! # One cycle with a summary
//! strmsync once
//!
//! # Inspect the persisted catalog
//! strmsync status
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;

// Re-export main types at crate root for convenience
pub use adapters::{MetadataSource, PlaylistSource};
pub use config::{ConfigError, ResolvedConfig};
pub use core::{CatalogCache, CycleReport, SyncNotification, SyncOptions, SyncOrchestrator};
pub use domain::{MediaKind, MediaMetadata, StreamRecord, StreamStatus};
