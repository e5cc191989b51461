//! Persisted catalog state.
//!
//! Three JSON documents live in the data directory:
//!
//! ```text
//! <data_dir>/
//! ├── playlists.json   # endpoint -> raw playlist lines (recovery cache)
//! ├── streams.json     # stream id -> StreamRecord
//! └── metadata.json    # IMDB id -> TMDB object, or null while pending
//! ```
//!
//! Every document is fully rewritten after the stage that mutates it. Maps
//! are ordered so identical state always produces identical bytes.

use std::collections::BTreeMap;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tempfile::NamedTempFile;
use tokio::fs;
use tracing::debug;

use crate::domain::{EnrichmentEntry, StreamRecord};

pub const PLAYLISTS_FILE: &str = "playlists.json";
pub const STREAMS_FILE: &str = "streams.json";
pub const METADATA_FILE: &str = "metadata.json";

/// In-memory catalog plus the location it is persisted to
#[derive(Debug, Default)]
pub struct CatalogCache {
    data_dir: PathBuf,

    /// Raw playlist lines per endpoint
    pub playlists: BTreeMap<String, Vec<String>>,

    /// Stream records per id
    pub streams: BTreeMap<String, StreamRecord>,

    /// Metadata cache entries per IMDB id
    pub metadata: BTreeMap<String, EnrichmentEntry>,

    /// Whether a stream catalog existed when the cache was loaded
    has_cache: bool,
}

impl CatalogCache {
    /// Create an empty cache rooted at `data_dir` without touching disk
    pub fn empty(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Default::default()
        }
    }

    /// Load whatever state exists in `data_dir`
    pub async fn load(data_dir: impl Into<PathBuf>) -> Result<Self> {
        let mut cache = Self::empty(data_dir);

        if let Some(playlists) = read_json(&cache.playlists_path()).await? {
            cache.playlists = playlists;
        }
        if let Some(streams) = read_json(&cache.streams_path()).await? {
            cache.streams = streams;
            cache.has_cache = true;
        }
        if let Some(metadata) = read_json(&cache.metadata_path()).await? {
            cache.metadata = metadata;
        }

        debug!(
            data_dir = %cache.data_dir.display(),
            playlists = cache.playlists.len(),
            streams = cache.streams.len(),
            metadata = cache.metadata.len(),
            has_cache = cache.has_cache,
            "Loaded catalog cache"
        );

        Ok(cache)
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// True when this install resumed from a persisted stream catalog
    pub fn has_cache(&self) -> bool {
        self.has_cache
    }

    pub fn playlists_path(&self) -> PathBuf {
        self.data_dir.join(PLAYLISTS_FILE)
    }

    pub fn streams_path(&self) -> PathBuf {
        self.data_dir.join(STREAMS_FILE)
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.data_dir.join(METADATA_FILE)
    }

    pub async fn save_playlists(&self) -> Result<()> {
        write_json(&self.playlists_path(), &self.playlists).await
    }

    pub async fn save_streams(&self) -> Result<()> {
        write_json(&self.streams_path(), &self.streams).await
    }

    pub async fn save_metadata(&self) -> Result<()> {
        write_json(&self.metadata_path(), &self.metadata).await
    }

    /// IMDB ids whose metadata has been requested but not resolved
    pub fn pending_metadata(&self) -> Vec<String> {
        self.metadata
            .iter()
            .filter(|(_, entry)| entry.is_pending())
            .map(|(id, _)| id.clone())
            .collect()
    }
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let content = match fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to read cache file: {}", path.display()))
        }
    };

    let value = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse cache file: {}", path.display()))?;

    Ok(Some(value))
}

async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let content = serde_json::to_string_pretty(value)
        .with_context(|| format!("Failed to serialize cache file: {}", path.display()))?;

    let target = path.to_path_buf();
    tokio::task::spawn_blocking(move || write_atomic(&target, content.as_bytes()))
        .await
        .context("Cache writer task failed")?
}

/// Write through a temp file in the same directory, then rename over the target
fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    let dir = path.parent().unwrap_or(Path::new("."));
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create directory: {}", dir.display()))?;

    let mut temp = NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create temp file in: {}", dir.display()))?;
    temp.write_all(content)
        .with_context(|| format!("Failed to write cache file: {}", path.display()))?;
    temp.persist(path)
        .map_err(|e| e.error)
        .with_context(|| format!("Failed to replace cache file: {}", path.display()))?;

    Ok(())
}
