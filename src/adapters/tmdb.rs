//! TMDB `find` client.
//!
//! `GET /3/find/<imdb_id>?external_source=imdb_id` returns one result array
//! per media kind. The first object of the first non-empty array is used.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::domain::MediaMetadata;

use super::MetadataSource;

pub const DEFAULT_BASE_URL: &str = "https://api.themoviedb.org/3";

/// Result arrays in lookup order, with the media type each one implies
pub const RESULT_KINDS: [(&str, &str); 5] = [
    ("movie_results", "movie"),
    ("tv_results", "tv"),
    ("tv_episode_results", "tv_episode"),
    ("tv_season_results", "tv_season"),
    ("person_results", "person"),
];

pub struct TmdbClient {
    base_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl TmdbClient {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key,
            client: reqwest::Client::new(),
        }
    }

    fn find_url(&self, imdb_id: &str) -> String {
        format!(
            "{}/find/{}?external_source=imdb_id",
            self.base_url.trim_end_matches('/'),
            imdb_id
        )
    }
}

/// Pick the metadata object out of a `find` response body
pub fn select_result(body: &Value) -> Option<MediaMetadata> {
    if body.get("success").and_then(Value::as_bool) == Some(false) {
        return None;
    }

    RESULT_KINDS.iter().find_map(|(field, media_type)| {
        let mut object = body.get(*field)?.as_array()?.first()?.clone();
        if let Some(map) = object.as_object_mut() {
            map.entry("media_type")
                .or_insert_with(|| Value::String(media_type.to_string()));
        }
        Some(MediaMetadata::new(object))
    })
}

#[async_trait]
impl MetadataSource for TmdbClient {
    fn name(&self) -> &str {
        "tmdb"
    }

    async fn find_by_imdb_id(&self, imdb_id: &str) -> Result<Option<MediaMetadata>> {
        let mut request = self
            .client
            .get(self.find_url(imdb_id))
            .header("accept", "application/json");

        if let Some(ref key) = self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("Failed to query TMDB for {}", imdb_id))?;

        let body: Value = response
            .json()
            .await
            .with_context(|| format!("Failed to parse TMDB response for {}", imdb_id))?;

        debug!(%imdb_id, "Loaded TMDB data");

        Ok(select_result(&body))
    }
}
