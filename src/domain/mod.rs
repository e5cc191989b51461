//! Domain types for the sync pipeline.
//!
//! This module contains the core data structures:
//! - StreamRecord: one playlist entry and its status
//! - Metadata: resolved TMDB objects and cache entries

pub mod metadata;
pub mod stream;

// Re-export commonly used types
pub use metadata::{EnrichmentEntry, MediaKind, MediaMetadata};
pub use stream::{Attributes, Enrichment, OutputPaths, StreamRecord, StreamStatus};

/// Attribute holding the external metadata identifier
pub const IMDB_ID: &str = "tvg-id";

/// Attribute holding the display name
pub const STREAM_NAME: &str = "tvg-name";

/// Positional season marker (`S01`)
pub const SEASON: &str = "season";

/// Positional episode marker (`E02`)
pub const EPISODE: &str = "episode";
