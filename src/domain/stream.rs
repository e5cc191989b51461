//! Stream records derived from playlist entries.
//!
//! A StreamRecord is created the first time its id is sighted and then lives
//! in the stream catalog forever. Only the URL and derived fields change.

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Ordered attribute list extracted from a descriptor line.
///
/// Iteration order is the order of first assignment. Stream ids are derived
/// from this order, so it must survive save/load unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes(Vec<(String, String)>);

impl Attributes {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Set a value. Re-assigning an existing key keeps its original position.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();

        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.0.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for Attributes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, value) in &self.0 {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Attributes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct AttributesVisitor;

        impl<'de> Visitor<'de> for AttributesVisitor {
            type Value = Attributes;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of attribute names to string values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Attributes, A::Error> {
                let mut attributes = Attributes::new();
                while let Some((key, value)) = access.next_entry::<String, String>()? {
                    attributes.insert(key, value);
                }
                Ok(attributes)
            }
        }

        deserializer.deserialize_map(AttributesVisitor)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut attributes = Attributes::new();
        for (key, value) in iter {
            attributes.insert(key, value);
        }
        attributes
    }
}

/// Status of a stream record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamStatus {
    /// First sighting, not yet enriched
    New,

    /// URL changed since the last sighting
    Modified,

    /// Enriched and waiting to be written
    Ready,

    /// Files written
    Exists,

    /// Enrichment found the record structurally incomplete
    Fault,
}

impl StreamStatus {
    /// Whether the enrichment stage should look at records in this status
    pub fn awaits_enrichment(self) -> bool {
        matches!(self, StreamStatus::New | StreamStatus::Modified)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StreamStatus::New => "new",
            StreamStatus::Modified => "modified",
            StreamStatus::Ready => "ready",
            StreamStatus::Exists => "exists",
            StreamStatus::Fault => "fault",
        }
    }
}

impl Default for StreamStatus {
    fn default() -> Self {
        Self::New
    }
}

impl fmt::Display for StreamStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata fields copied onto a record by the enrichment stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrichment {
    /// TMDB media type (`movie` or `tv`)
    pub media_type: String,

    pub title: String,

    pub release_date: String,
}

/// Output file locations, relative to the output directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputPaths {
    /// Pretty-printed metadata object (`.json`)
    pub metadata_file: String,

    /// Stream URL pointer (`.strm`)
    pub pointer_file: String,
}

impl OutputPaths {
    /// Directory that must exist before the pointer file is written
    pub fn pointer_dir(&self) -> &str {
        self.pointer_file
            .rsplit_once('/')
            .map(|(dir, _)| dir)
            .unwrap_or("")
    }
}

/// One playlist entry, keyed by its derived id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamRecord {
    /// Underscore join of the attribute values, never recomputed
    pub id: String,

    pub attributes: Attributes,

    /// Current stream endpoint
    pub url: String,

    #[serde(default)]
    pub status: StreamStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enrichment: Option<Enrichment>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_paths: Option<OutputPaths>,
}

impl StreamRecord {
    /// Create a record on first sighting
    pub fn new(id: String, attributes: Attributes, url: String) -> Self {
        Self {
            id,
            attributes,
            url,
            status: StreamStatus::New,
            enrichment: None,
            output_paths: None,
        }
    }

    /// External metadata identifier (IMDB id)
    pub fn imdb_id(&self) -> Option<&str> {
        self.attributes.get(super::IMDB_ID)
    }

    pub fn season(&self) -> Option<&str> {
        self.attributes.get(super::SEASON)
    }

    pub fn episode(&self) -> Option<&str> {
        self.attributes.get(super::EPISODE)
    }
}
