//! In-memory sources and helpers shared by the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::Value;

use strmsync::core::{CatalogCache, SyncOptions, SyncOrchestrator};
use strmsync::domain::MediaMetadata;
use strmsync::{MetadataSource, PlaylistSource};

pub const TV_ENDPOINT: &str = "tvshows/1";
pub const MOVIES_ENDPOINT: &str = "movies";

/// Playlist bodies keyed by endpoint; unknown endpoints fail
#[derive(Default)]
pub struct FakePlaylists {
    bodies: Mutex<HashMap<String, String>>,
}

impl FakePlaylists {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set(&self, endpoint: &str, body: String) {
        self.bodies.lock().unwrap().insert(endpoint.to_string(), body);
    }

    pub fn remove(&self, endpoint: &str) {
        self.bodies.lock().unwrap().remove(endpoint);
    }
}

#[async_trait]
impl PlaylistSource for FakePlaylists {
    fn name(&self) -> &str {
        "fake-playlists"
    }

    async fn fetch_playlist(&self, endpoint: &str) -> Result<String> {
        self.bodies
            .lock()
            .unwrap()
            .get(endpoint)
            .cloned()
            .ok_or_else(|| anyhow!("Endpoint unavailable: {}", endpoint))
    }
}

/// Metadata objects keyed by IMDB id, counting lookups
#[derive(Default)]
pub struct FakeMetadata {
    entries: Mutex<HashMap<String, Value>>,
    lookups: AtomicUsize,
}

impl FakeMetadata {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set(&self, imdb_id: &str, value: Value) {
        self.entries.lock().unwrap().insert(imdb_id.to_string(), value);
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetadataSource for FakeMetadata {
    fn name(&self) -> &str {
        "fake-metadata"
    }

    async fn find_by_imdb_id(&self, imdb_id: &str) -> Result<Option<MediaMetadata>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .entries
            .lock()
            .unwrap()
            .get(imdb_id)
            .cloned()
            .map(MediaMetadata::new))
    }
}

/// Render descriptor/URL pairs as an extended-M3U body
pub fn playlist(entries: &[(&str, &str)]) -> String {
    let mut body = String::from("#EXTM3U\n");
    for (descriptor, url) in entries {
        body.push_str(descriptor);
        body.push('\n');
        body.push_str(url);
        body.push('\n');
    }
    body
}

pub fn movie_descriptor(imdb_id: &str, name: &str) -> String {
    format!(
        r#"#EXTINF:-1 tvg-id="{}" tvg-name="{}" group-title="Movies",{}"#,
        imdb_id, name, name
    )
}

pub fn options(output_dir: &Path) -> SyncOptions {
    SyncOptions {
        endpoints: vec![TV_ENDPOINT.to_string(), MOVIES_ENDPOINT.to_string()],
        output_dir: output_dir.to_path_buf(),
        scan_interval: Duration::from_millis(10),
        fetch_concurrency: 2,
        work_concurrency: 4,
    }
}

/// Orchestrator resuming from whatever is persisted in `data_dir`
pub async fn orchestrator(
    data_dir: &Path,
    output_dir: &Path,
    playlists: &Arc<FakePlaylists>,
    metadata: &Arc<FakeMetadata>,
) -> SyncOrchestrator {
    let cache = CatalogCache::load(data_dir).await.unwrap();
    SyncOrchestrator::new(
        options(output_dir),
        cache,
        playlists.clone(),
        metadata.clone(),
    )
}

pub fn read(path: impl AsRef<Path>) -> String {
    std::fs::read_to_string(path.as_ref())
        .unwrap_or_else(|e| panic!("Failed to read {}: {}", path.as_ref().display(), e))
}
