//! TMDB metadata objects and their cache entries.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// Media kinds that can be materialized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Movie,
    Tv,
}

impl MediaKind {
    /// Map a TMDB `media_type` value to a supported kind
    pub fn from_media_type(media_type: &str) -> Option<Self> {
        match media_type {
            "movie" => Some(MediaKind::Movie),
            "tv" => Some(MediaKind::Tv),
            _ => None,
        }
    }

    pub fn media_type(self) -> &'static str {
        match self {
            MediaKind::Movie => "movie",
            MediaKind::Tv => "tv",
        }
    }

    /// Subdirectory of `media/` holding this kind
    pub fn directory(self) -> &'static str {
        match self {
            MediaKind::Movie => "movies",
            MediaKind::Tv => "tv",
        }
    }

    fn title_field(self) -> &'static str {
        match self {
            MediaKind::Movie => "title",
            MediaKind::Tv => "name",
        }
    }

    fn date_field(self) -> &'static str {
        match self {
            MediaKind::Movie => "release_date",
            MediaKind::Tv => "first_air_date",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.media_type())
    }
}

/// A resolved TMDB object, kept verbatim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaMetadata(Value);

impl MediaMetadata {
    pub fn new(raw: Value) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> &Value {
        &self.0
    }

    pub fn media_type(&self) -> Option<&str> {
        self.0.get("media_type").and_then(Value::as_str)
    }

    pub fn kind(&self) -> Option<MediaKind> {
        self.media_type().and_then(MediaKind::from_media_type)
    }

    /// Title using the field appropriate for the kind
    pub fn title(&self, kind: MediaKind) -> Option<&str> {
        self.non_empty_str(kind.title_field())
    }

    /// Release or first-air date using the field appropriate for the kind
    pub fn release_date(&self, kind: MediaKind) -> Option<&str> {
        self.non_empty_str(kind.date_field())
    }

    fn non_empty_str(&self, field: &str) -> Option<&str> {
        self.0
            .get(field)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }
}

/// Metadata cache entry for one external identifier.
///
/// An absent map key means "never requested". `Pending` is persisted as
/// JSON `null` and is picked up by the next fetch stage.
#[derive(Debug, Clone, PartialEq)]
pub enum EnrichmentEntry {
    Pending,
    Resolved(MediaMetadata),
}

impl EnrichmentEntry {
    pub fn is_pending(&self) -> bool {
        matches!(self, EnrichmentEntry::Pending)
    }

    pub fn resolved(&self) -> Option<&MediaMetadata> {
        match self {
            EnrichmentEntry::Resolved(metadata) => Some(metadata),
            EnrichmentEntry::Pending => None,
        }
    }
}

impl Serialize for EnrichmentEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.resolved().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for EnrichmentEntry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Option::<MediaMetadata>::deserialize(deserializer)?;
        Ok(match value {
            Some(metadata) => EnrichmentEntry::Resolved(metadata),
            None => EnrichmentEntry::Pending,
        })
    }
}
