//! Maps resolved TMDB metadata onto stream records.
//!
//! Output layout relative to the output directory:
//!
//! ```text
//! media/movies/<Title (Year)>/<Title (Year)>.strm
//! media/movies/<Title (Year)>/<Title (Year)>.json
//! media/tv/<Title (Year)>/<Title (Year)>.json
//! media/tv/<Title (Year)>/<Title (Year)> - Season 1/<Title (Year)> - S01E02.strm
//! ```

use anyhow::Result;
use tracing::{debug, error};

use crate::domain::{Enrichment, EnrichmentEntry, MediaKind, OutputPaths, StreamRecord, StreamStatus};

/// Characters replaced to keep titles filesystem-safe, applied in order
pub const CLEAN_CHARS: [(&str, &str); 9] = [
    (":", " -"),
    ("/", "-"),
    ("\\", "-"),
    ("?", ""),
    ("*", ""),
    ("\"", "'"),
    ("<", ""),
    (">", ""),
    ("|", "-"),
];

/// What the merger did with a record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnrichmentOutcome {
    /// Metadata not resolved yet, retried next cycle
    Unresolved,

    /// Metadata resolved to a kind that cannot be materialized
    Unsupported { media_type: Option<String> },

    /// Supported kind but the record lacks a required attribute
    Fault,

    /// Enriched and ready to be written
    Ready,
}

/// A record is merged at most once per enrichment
pub fn is_eligible(record: &StreamRecord) -> bool {
    record.status.awaits_enrichment() && record.enrichment.is_none()
}

/// Merge the metadata entry for the record's external identifier.
///
/// Missing title or release date on a supported kind is an error; the record
/// is left untouched so the next cycle can try again.
pub fn merge(record: &mut StreamRecord, entry: Option<&EnrichmentEntry>) -> Result<EnrichmentOutcome> {
    let Some(metadata) = entry.and_then(EnrichmentEntry::resolved) else {
        debug!(stream_id = %record.id, imdb_id = ?record.imdb_id(), "Unable to process media");
        return Ok(EnrichmentOutcome::Unresolved);
    };

    let Some(kind) = metadata.kind() else {
        error!(
            stream_id = %record.id,
            media_type = ?metadata.media_type(),
            "Unsupported media type"
        );
        return Ok(EnrichmentOutcome::Unsupported {
            media_type: metadata.media_type().map(String::from),
        });
    };

    if kind == MediaKind::Tv && record.season().is_none() {
        record.status = StreamStatus::Fault;
        return Ok(EnrichmentOutcome::Fault);
    }

    let title = metadata
        .title(kind)
        .ok_or_else(|| anyhow::anyhow!("TMDB {} object has no title", kind))?;
    let release_date = metadata
        .release_date(kind)
        .ok_or_else(|| anyhow::anyhow!("TMDB {} object has no release date", kind))?;

    if record.output_paths.is_none() {
        record.output_paths = Some(derive_output_paths(
            kind,
            title,
            release_date,
            record.season(),
            record.episode(),
        ));
    }

    record.enrichment = Some(Enrichment {
        media_type: kind.media_type().to_string(),
        title: title.to_string(),
        release_date: release_date.to_string(),
    });
    record.status = StreamStatus::Ready;

    Ok(EnrichmentOutcome::Ready)
}

/// Replace characters that are unsafe in file names
pub fn sanitize(name: &str) -> String {
    CLEAN_CHARS
        .iter()
        .fold(name.to_string(), |acc, &(from, to)| acc.replace(from, to))
}

/// Compute where a record's files live
pub fn derive_output_paths(
    kind: MediaKind,
    title: &str,
    release_date: &str,
    season: Option<&str>,
    episode: Option<&str>,
) -> OutputPaths {
    let year = release_date.split('-').next().unwrap_or_default();
    let root = sanitize(&format!("{} ({})", title, year));
    let media_dir = format!("media/{}", kind.directory());

    let mut basename = format!("{}/{}", root, root);
    if kind == MediaKind::Tv {
        let season = season.unwrap_or_default();
        basename = format!(
            "{} - {}/{} - {}{}",
            basename,
            season_name(season),
            root,
            season,
            episode.unwrap_or_default()
        );
    }

    OutputPaths {
        metadata_file: format!("{}/{}/{}.json", media_dir, root, root),
        pointer_file: format!("{}/{}.strm", media_dir, basename),
    }
}

/// `S01` -> `Season 1`
fn season_name(season: &str) -> String {
    let number = season.trim_start_matches('S');
    match number.parse::<u32>() {
        Ok(n) => format!("Season {}", n),
        Err(_) => format!("Season {}", number),
    }
}
