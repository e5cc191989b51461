//! Stream identity derivation from extended-M3U descriptor lines.
//!
//! A descriptor looks like:
//!
//! ```text
//! #EXTINF:-1 tvg-id="tt0903747" tvg-name="Breaking" group-title="Series",Breaking Bad S01 E02
//! http://host/path/stream.ts
//! ```
//!
//! Recognized `key="value"` tokens are extracted first, in the order of
//! [`EXTRACT_KEYS`], then positional validators recover season/episode
//! markers from the tail of the token list.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::domain::{Attributes, EPISODE, IMDB_ID, SEASON, STREAM_NAME};

/// Tag that starts a descriptor line
pub const M3U_EXT_INF: &str = "#EXTINF";

/// Attribute keys extracted from `key="value"` tokens
pub const EXTRACT_KEYS: [&str; 2] = [IMDB_ID, STREAM_NAME];

/// Errors produced while reading playlist lines
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("Not a descriptor line: {0}")]
    NotDescriptor(String),

    #[error("Descriptor has no URL line: {descriptor}")]
    MissingUrl { descriptor: String },

    #[error("Invalid media URL for stream: {descriptor}, URL: {url}")]
    InvalidUrl { descriptor: String, url: String },
}

/// Matches a token counted from the end of the descriptor
struct PositionalValidator {
    key: &'static str,
    offset: usize,
    pattern: Regex,
}

impl PositionalValidator {
    fn new(key: &'static str, offset: usize, pattern: &str) -> Self {
        Self {
            key,
            offset,
            pattern: Regex::new(pattern).expect("validator pattern is valid"),
        }
    }

    fn extract<'a>(&self, tokens: &[&'a str]) -> Option<&'a str> {
        let index = tokens.len().checked_sub(self.offset)?;
        let token = tokens.get(index)?;
        self.pattern
            .captures(token)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
    }
}

// First match wins per key
static VALIDATORS: Lazy<Vec<PositionalValidator>> = Lazy::new(|| {
    vec![
        PositionalValidator::new(SEASON, 2, r"^(S\d+)$"),
        PositionalValidator::new(SEASON, 1, r"^(S\d+)E\d+"),
        PositionalValidator::new(EPISODE, 1, r"^(?:S\d+)?(E\d+)"),
    ]
});

/// A descriptor/URL pair that passed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedEntry {
    pub id: String,
    pub attributes: Attributes,
    pub url: String,
}

/// Extract the attribute list from a descriptor line
pub fn parse(line: &str) -> Result<Attributes, CodecError> {
    let line = line.trim_end_matches(['\r', '\n']);
    if !line.starts_with(M3U_EXT_INF) {
        return Err(CodecError::NotDescriptor(line.to_string()));
    }

    let tokens: Vec<&str> = line.split_whitespace().collect();
    let mut attributes = Attributes::new();

    for token in &tokens {
        if !token.contains("=\"") {
            continue;
        }

        let mut parts = token.split('=');
        let key = parts.next().unwrap_or_default();
        let value = parts.next().unwrap_or_default().replace('"', "");

        if EXTRACT_KEYS.contains(&key) {
            attributes.insert(key, value);
        }
    }

    for validator in VALIDATORS.iter() {
        if attributes.contains(validator.key) {
            continue;
        }
        if let Some(value) = validator.extract(&tokens) {
            attributes.insert(validator.key, value);
        }
    }

    Ok(attributes)
}

/// Join the attribute values in insertion order
pub fn derive_id(attributes: &Attributes) -> String {
    attributes.values().collect::<Vec<_>>().join("_")
}

/// A URL must at least carry a scheme separator
pub fn validate_url(url: &str) -> bool {
    url.contains("://")
}

/// Walk a playlist and pair each descriptor with the following URL line.
///
/// Invalid pairs are returned as errors next to the valid entries so the
/// caller can log them without aborting the playlist.
pub fn parse_playlist(lines: &[String]) -> (Vec<ParsedEntry>, Vec<CodecError>) {
    let mut entries = Vec::new();
    let mut errors = Vec::new();

    for (index, line) in lines.iter().enumerate() {
        if !line.starts_with(M3U_EXT_INF) {
            continue;
        }

        let descriptor = line.trim_end_matches(['\r', '\n']);
        let Some(url) = lines.get(index + 1).map(|l| l.trim()) else {
            errors.push(CodecError::MissingUrl {
                descriptor: descriptor.to_string(),
            });
            continue;
        };

        if !validate_url(url) {
            errors.push(CodecError::InvalidUrl {
                descriptor: descriptor.to_string(),
                url: url.to_string(),
            });
            continue;
        }

        match parse(descriptor) {
            Ok(attributes) => entries.push(ParsedEntry {
                id: derive_id(&attributes),
                attributes,
                url: url.to_string(),
            }),
            Err(e) => errors.push(e),
        }
    }

    (entries, errors)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(text: &str) -> Vec<String> {
        text.split('\n').map(String::from).collect()
    }

    #[test]
    fn test_parse_compact_episode_marker() {
        let attributes =
            parse(r#"#EXTINF:-1 tvg-id="tt001" tvg-name="Show" S01E02,Show"#).unwrap();

        let pairs: Vec<(&str, &str)> = attributes.iter().collect();
        assert_eq!(
            pairs,
            vec![
                ("tvg-id", "tt001"),
                ("tvg-name", "Show"),
                ("season", "S01"),
                ("episode", "E02"),
            ]
        );
        assert_eq!(derive_id(&attributes), "tt001_Show_S01_E02");
    }

    #[test]
    fn test_parse_split_episode_marker() {
        let attributes = parse(
            r#"#EXTINF:-1 tvg-id="tt002" tvg-name="Other" group-title="Series",Other Show S03 E10"#,
        )
        .unwrap();

        assert_eq!(attributes.get(SEASON), Some("S03"));
        assert_eq!(attributes.get(EPISODE), Some("E10"));
        assert_eq!(derive_id(&attributes), "tt002_Other_S03_E10");
    }

    #[test]
    fn test_parse_movie_has_no_markers() {
        let attributes =
            parse(r#"#EXTINF:-1 tvg-id="tt003" tvg-name="Film" group-title="Movies",Film (2001)"#)
                .unwrap();

        assert!(!attributes.contains(SEASON));
        assert!(!attributes.contains(EPISODE));
        assert_eq!(derive_id(&attributes), "tt003_Film");
    }

    #[test]
    fn test_unrecognized_keys_are_ignored() {
        let attributes =
            parse(r#"#EXTINF:-1 tvg-logo="http://x/logo.png" tvg-id="tt004" group-title="X",Name"#)
                .unwrap();
        assert_eq!(attributes.len(), 1);
        assert_eq!(attributes.get(IMDB_ID), Some("tt004"));
    }

    #[test]
    fn test_short_descriptor_skips_out_of_range_validators() {
        let attributes = parse("#EXTINF:-1").unwrap();
        assert!(attributes.is_empty());
        assert_eq!(derive_id(&attributes), "");
    }

    #[test]
    fn test_not_a_descriptor() {
        assert!(matches!(
            parse("http://x/a.ts"),
            Err(CodecError::NotDescriptor(_))
        ));
    }

    #[test]
    fn test_derive_id_is_stable() {
        let line = r#"#EXTINF:-1 tvg-id="tt001" tvg-name="Show" S01E02,Show"#;
        let first = derive_id(&parse(line).unwrap());
        for _ in 0..10 {
            assert_eq!(derive_id(&parse(line).unwrap()), first);
        }
    }

    #[test]
    fn test_validate_url() {
        assert!(validate_url("http://x/a.ts"));
        assert!(validate_url("rtmp://host/live"));
        assert!(!validate_url("x/a.ts"));
        assert!(!validate_url(""));
    }

    #[test]
    fn test_parse_playlist_rejects_bad_urls() {
        let playlist = lines(
            "#EXTM3U\n\
             #EXTINF:-1 tvg-id=\"tt001\" tvg-name=\"Show\" S01E02,Show\n\
             http://x/a.ts\n\
             #EXTINF:-1 tvg-id=\"tt009\" tvg-name=\"Broken\",Broken\n\
             not-a-url\n\
             #EXTINF:-1 tvg-id=\"tt010\" tvg-name=\"Last\",Last",
        );

        let (entries, errors) = parse_playlist(&playlist);

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, "tt001_Show_S01_E02");
        assert_eq!(entries[0].url, "http://x/a.ts");

        assert_eq!(errors.len(), 2);
        assert!(matches!(errors[0], CodecError::InvalidUrl { .. }));
        assert!(matches!(errors[1], CodecError::MissingUrl { .. }));
    }

    #[test]
    fn test_parse_playlist_strips_carriage_returns() {
        let playlist = lines("#EXTINF:-1 tvg-id=\"tt001\" group-title=\"Movies\",Film\r\nhttp://x/a.ts\r");
        let (entries, errors) = parse_playlist(&playlist);

        assert!(errors.is_empty());
        assert_eq!(entries[0].url, "http://x/a.ts");
        assert_eq!(entries[0].id, "tt001");
    }
}
