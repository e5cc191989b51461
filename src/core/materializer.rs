//! Writes `.strm` pointer files and metadata files for ready records.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use tokio::fs;
use tracing::{debug, error};

use crate::domain::{MediaKind, MediaMetadata, StreamRecord, StreamStatus};

/// Announcement that a record was synchronized
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncNotification {
    pub stream_id: String,
    pub status: StreamStatus,
    pub media_type: String,
    pub title: String,
    pub imdb_id: Option<String>,
    pub season: Option<String>,
    pub episode: Option<String>,
}

impl SyncNotification {
    pub fn for_record(record: &StreamRecord) -> Self {
        let (media_type, title) = record
            .enrichment
            .as_ref()
            .map(|e| (e.media_type.clone(), e.title.clone()))
            .unwrap_or_default();

        Self {
            stream_id: record.id.clone(),
            status: record.status,
            media_type,
            title,
            imdb_id: record.imdb_id().map(String::from),
            season: record.season().map(String::from),
            episode: record.episode().map(String::from),
        }
    }
}

impl fmt::Display for SyncNotification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = self.status.as_str();
        let mut chars = status.chars();
        let capitalized: String = match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        };

        write!(
            f,
            "{} {}: {} [{}]",
            capitalized,
            self.media_type,
            self.title,
            self.imdb_id.as_deref().unwrap_or("-")
        )?;

        if MediaKind::from_media_type(&self.media_type) == Some(MediaKind::Tv) {
            write!(
                f,
                " Season {}, Episode {}",
                self.season.as_deref().unwrap_or("-"),
                self.episode.as_deref().unwrap_or("-")
            )?;
        }

        Ok(())
    }
}

/// Files written for one record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenRecord {
    pub pointer_written: bool,
    pub notification: Option<SyncNotification>,
}

pub fn is_ready(record: &StreamRecord) -> bool {
    record.status == StreamStatus::Ready
}

/// Distinct pointer directories needed by all ready records
pub fn plan_directories(streams: &BTreeMap<String, StreamRecord>) -> BTreeSet<String> {
    streams
        .values()
        .filter(|record| is_ready(record))
        .filter_map(|record| record.output_paths.as_ref())
        .map(|paths| paths.pointer_dir().to_string())
        .collect()
}

/// Create each planned directory once
pub async fn prepare_directories(output_dir: &Path, directories: &BTreeSet<String>) -> Result<usize> {
    for directory in directories {
        let path = output_dir.join(directory);
        fs::create_dir_all(&path)
            .await
            .with_context(|| format!("Failed to create directory: {}", path.display()))?;
    }

    Ok(directories.len())
}

/// Write the pointer and metadata files for a ready record.
///
/// The status transition to `Exists` is left to the caller, which owns the
/// catalog.
pub async fn write_record(
    output_dir: PathBuf,
    record: StreamRecord,
    metadata: Option<MediaMetadata>,
    notify: bool,
) -> Result<WrittenRecord> {
    let paths = record
        .output_paths
        .as_ref()
        .with_context(|| format!("Ready stream has no output paths: {}", record.id))?;

    let pointer_path = output_dir.join(&paths.pointer_file);
    let metadata_path = output_dir.join(&paths.metadata_file);

    // The metadata file sits in the pointer directory or one of its ancestors
    if let Some(parent) = pointer_path.parent() {
        fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let pointer_written = if record.url.is_empty() {
        error!(stream_id = %record.id, "Media URL is empty");
        false
    } else {
        fs::write(&pointer_path, &record.url)
            .await
            .with_context(|| format!("Failed to write stream file: {}", pointer_path.display()))?;
        true
    };

    let content = serde_json::to_string_pretty(&metadata.as_ref().map(MediaMetadata::raw))
        .context("Failed to serialize metadata")?;
    fs::write(&metadata_path, content)
        .await
        .with_context(|| format!("Failed to write metadata file: {}", metadata_path.display()))?;

    debug!(stream_id = %record.id, path = %pointer_path.display(), "Stream file written");

    Ok(WrittenRecord {
        pointer_written,
        notification: notify.then(|| SyncNotification::for_record(&record)),
    })
}
