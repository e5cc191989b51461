//! Adapter interfaces for external services.
//!
//! The sync pipeline only talks to the outside world through these traits:
//! one source of playlists, one source of metadata.

pub mod apollo;
pub mod tmdb;

use anyhow::Result;
use async_trait::async_trait;

use crate::domain::MediaMetadata;

pub use apollo::ApolloClient;
pub use tmdb::TmdbClient;

/// Source of extended-M3U playlists
#[async_trait]
pub trait PlaylistSource: Send + Sync {
    /// Human-readable source name
    fn name(&self) -> &str;

    /// Download the raw playlist text for an endpoint
    async fn fetch_playlist(&self, endpoint: &str) -> Result<String>;
}

/// Source of media metadata keyed by IMDB id
#[async_trait]
pub trait MetadataSource: Send + Sync {
    /// Human-readable source name
    fn name(&self) -> &str;

    /// Look up an IMDB id. `Ok(None)` means the service has nothing for it.
    async fn find_by_imdb_id(&self, imdb_id: &str) -> Result<Option<MediaMetadata>>;
}
