//! Reconciles parsed playlist entries against the stream catalog.
//!
//! Status transitions on ingest:
//!
//! ```text
//! unseen id            -> New
//! known id, same URL   -> unchanged
//! known id, new URL    -> Modified (enrichment cleared, output paths kept)
//! ```
//!
//! An id transitions at most once per stage. The first sighting wins and
//! later duplicates are ignored, so a descriptor listed under two endpoints
//! with different URLs settles on one URL instead of flipping every cycle.
//!
//! Once every entry is in, [`MergeEngine::finish`] keeps the metadata cache
//! in step with the records sharing each external identifier: the entry is
//! dropped only when all of them are faulted, and requested when any healthy
//! record lacks one.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::debug;

use crate::domain::{EnrichmentEntry, StreamRecord, StreamStatus};

use super::cache::CatalogCache;
use super::identity::ParsedEntry;

/// What ingesting a single entry did to the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    Created,
    Unchanged,
    Modified,
    /// Id already ingested earlier in this stage
    Duplicate,
}

/// Counts for one parse stage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MergeStats {
    pub created: usize,
    pub unchanged: usize,
    pub modified: usize,
    pub duplicates: usize,
    pub metadata_requested: usize,
    pub metadata_dropped: usize,
}

impl MergeStats {
    pub fn total(&self) -> usize {
        self.created + self.unchanged + self.modified
    }
}

/// Single writer for the stream catalog during the parse stage
pub struct MergeEngine<'a> {
    streams: &'a mut BTreeMap<String, StreamRecord>,
    metadata: &'a mut BTreeMap<String, EnrichmentEntry>,
    seen: BTreeSet<String>,
    stats: MergeStats,
}

impl<'a> MergeEngine<'a> {
    pub fn new(cache: &'a mut CatalogCache) -> Self {
        Self {
            streams: &mut cache.streams,
            metadata: &mut cache.metadata,
            seen: BTreeSet::new(),
            stats: MergeStats::default(),
        }
    }

    /// Apply one parsed entry
    pub fn ingest(&mut self, entry: ParsedEntry) -> IngestOutcome {
        let ParsedEntry { id, attributes, url } = entry;

        if !self.seen.insert(id.clone()) {
            debug!(stream_id = %id, %url, "Duplicate stream ignored");
            self.stats.duplicates += 1;
            return IngestOutcome::Duplicate;
        }

        match self.streams.get_mut(&id) {
            None => {
                debug!(stream_id = %id, %url, "Add new stream");
                self.streams
                    .insert(id.clone(), StreamRecord::new(id, attributes, url));
                self.stats.created += 1;
                IngestOutcome::Created
            }
            Some(record) if record.url == url => {
                debug!(stream_id = %id, "Stream already exists");
                self.stats.unchanged += 1;
                IngestOutcome::Unchanged
            }
            Some(record) => {
                debug!(stream_id = %id, %url, previous = %record.url, "Update stream URL");
                record.url = url;
                record.status = StreamStatus::Modified;
                record.enrichment = None;
                self.stats.modified += 1;
                IngestOutcome::Modified
            }
        }
    }

    /// Reconcile metadata requests with the catalog and return the stage counts
    pub fn finish(mut self) -> MergeStats {
        self.reconcile_metadata();
        self.stats
    }

    fn reconcile_metadata(&mut self) {
        // imdb id -> whether any record sharing it is healthy
        let mut health: BTreeMap<&str, bool> = BTreeMap::new();
        for record in self.streams.values() {
            let Some(imdb_id) = record.imdb_id() else {
                continue;
            };
            *health.entry(imdb_id).or_default() |= record.status != StreamStatus::Fault;
        }

        for (imdb_id, healthy) in health {
            let has_entry = self.metadata.contains_key(imdb_id);
            if healthy && !has_entry {
                self.metadata
                    .insert(imdb_id.to_string(), EnrichmentEntry::Pending);
                self.stats.metadata_requested += 1;
            } else if !healthy && has_entry {
                debug!(imdb_id, "Drop metadata for faulted streams");
                self.metadata.remove(imdb_id);
                self.stats.metadata_dropped += 1;
            }
        }
    }
}
