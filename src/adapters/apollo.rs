//! Apollo Group TV playlist client.
//!
//! Playlists are served at `<base>/<username>/<password>/<endpoint>`.

use anyhow::{Context, Result};
use async_trait::async_trait;

use super::PlaylistSource;

pub const DEFAULT_BASE_URL: &str = "https://tvnow.best/api/list";

/// Authenticated playlist client
pub struct ApolloClient {
    base_url: String,
    username: String,
    password: String,
    client: reqwest::Client,
}

impl ApolloClient {
    pub fn new(base_url: impl Into<String>, username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            username: username.into(),
            password: password.into(),
            client: reqwest::Client::new(),
        }
    }

    fn playlist_url(&self, endpoint: &str) -> String {
        format!(
            "{}/{}/{}/{}",
            self.base_url.trim_end_matches('/'),
            self.username,
            self.password,
            endpoint
        )
    }
}

#[async_trait]
impl PlaylistSource for ApolloClient {
    fn name(&self) -> &str {
        "apollo"
    }

    async fn fetch_playlist(&self, endpoint: &str) -> Result<String> {
        // The URL embeds credentials, so errors only name the endpoint
        let response = self
            .client
            .get(self.playlist_url(endpoint))
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("Request failed: {}", e.without_url()))
            .with_context(|| format!("Failed to load playlist: {}", endpoint))?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("Playlist endpoint '{}' returned {}", endpoint, status);
        }

        response
            .text()
            .await
            .with_context(|| format!("Failed to read playlist body: {}", endpoint))
    }
}
