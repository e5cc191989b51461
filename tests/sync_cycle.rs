//! Sync Cycle Integration Tests
//!
//! Full cycles against in-memory sources: path layout, idempotent re-runs,
//! URL changes, and notification silence on first import.

mod common;

use common::*;
use serde_json::json;
use strmsync::domain::StreamStatus;
use tempfile::TempDir;

const EPISODE_ID: &str = "tt001_Show_S01_E02";

fn movie_metadata(title: &str, date: &str) -> serde_json::Value {
    json!({ "media_type": "movie", "title": title, "release_date": date })
}

#[tokio::test]
async fn test_episode_written_to_season_directory() {
    let temp = TempDir::new().unwrap();
    let data_dir = temp.path().join("data");
    let output_dir = temp.path().join("out");

    let playlists = FakePlaylists::new();
    playlists.set(
        TV_ENDPOINT,
        playlist(&[(
            r#"#EXTINF:-1 tvg-id="tt001" tvg-name="Show" S01E02,Show"#,
            "http://x/a.ts",
        )]),
    );
    let metadata = FakeMetadata::new();
    metadata.set(
        "tt001",
        json!({ "media_type": "tv", "name": "Show", "first_air_date": "2019-05-01" }),
    );

    let mut sync = orchestrator(&data_dir, &output_dir, &playlists, &metadata).await;
    let report = sync.run_cycle().await.unwrap();

    // Movies endpoint is unavailable, the rest of the cycle still completes
    assert_eq!(report.playlists_loaded, 1);
    assert_eq!(report.unit_failures, 1);

    let record = &sync.cache().streams[EPISODE_ID];
    assert_eq!(record.status, StreamStatus::Exists);

    let pointer = output_dir.join("media/tv/Show (2019)/Show (2019) - Season 1/Show (2019) - S01E02.strm");
    assert_eq!(read(&pointer), "http://x/a.ts");

    let written: serde_json::Value =
        serde_json::from_str(&read(output_dir.join("media/tv/Show (2019)/Show (2019).json"))).unwrap();
    assert_eq!(written["name"], "Show");

    assert!(data_dir.join("playlists.json").exists());
    assert!(data_dir.join("streams.json").exists());
    assert!(data_dir.join("metadata.json").exists());
}

#[tokio::test]
async fn test_invalid_url_never_produces_record() {
    let temp = TempDir::new().unwrap();
    let playlists = FakePlaylists::new();
    playlists.set(
        MOVIES_ENDPOINT,
        playlist(&[
            (movie_descriptor("tt100", "Broken").as_str(), "not-a-url"),
            (movie_descriptor("tt101", "Good").as_str(), "http://x/good.ts"),
        ]),
    );
    let metadata = FakeMetadata::new();

    let mut sync = orchestrator(&temp.path().join("data"), temp.path(), &playlists, &metadata).await;
    let report = sync.run_cycle().await.unwrap();

    assert_eq!(report.parse_errors, 1);
    assert_eq!(sync.cache().streams.len(), 1);
    assert!(sync.cache().streams.contains_key("tt101_Good"));
    assert!(!sync.cache().metadata.contains_key("tt100"));
}

#[tokio::test]
async fn test_rerun_only_flips_ready_to_exists() {
    let temp = TempDir::new().unwrap();
    let data_dir = temp.path().join("data");

    let playlists = FakePlaylists::new();
    playlists.set(
        MOVIES_ENDPOINT,
        playlist(&[
            (movie_descriptor("tt101", "A").as_str(), "http://x/a.ts"),
            (movie_descriptor("tt102", "B").as_str(), "http://x/b.ts"),
            (movie_descriptor("tt103", "C").as_str(), "http://x/c.ts"),
        ]),
    );
    let metadata = FakeMetadata::new();
    metadata.set("tt101", movie_metadata("Film A", "2001-02-03"));
    metadata.set("tt102", movie_metadata("Film B", "2002-02-03"));
    metadata.set("tt103", movie_metadata("Film C", "2003-02-03"));

    // A file where the output directory should be makes every write fail
    let blocked = temp.path().join("blocked");
    std::fs::write(&blocked, "").unwrap();

    let mut first = orchestrator(&data_dir, &blocked, &playlists, &metadata).await;
    let report = first.run_cycle().await.unwrap();
    assert_eq!(report.enrichment.ready, 3);
    assert_eq!(report.materialize.written, 0);
    assert_eq!(report.unit_failures, 1 + 3);
    let ready_catalog = read(data_dir.join("streams.json"));

    // Restart against the persisted catalog with a writable output directory
    let output_dir = temp.path().join("out");
    let mut second = orchestrator(&data_dir, &output_dir, &playlists, &metadata).await;
    let report = second.run_cycle().await.unwrap();
    assert_eq!(report.materialize.written, 3);
    let exists_catalog = read(data_dir.join("streams.json"));

    assert_eq!(
        ready_catalog.replace(r#""status": "ready""#, r#""status": "exists""#),
        exists_catalog
    );

    // Resumed install notifies from its first cycle
    assert_eq!(report.materialize.notifications.len(), 3);

    // Unchanged sources leave the catalog byte-identical
    let lookups = metadata.lookups();
    let report = second.run_cycle().await.unwrap();
    assert_eq!(report.materialize.written, 0);
    assert_eq!(report.enrichment.eligible, 0);
    assert_eq!(metadata.lookups(), lookups);
    assert_eq!(read(data_dir.join("streams.json")), exists_catalog);
}

#[tokio::test]
async fn test_url_change_reenriches_record() {
    let temp = TempDir::new().unwrap();
    let output_dir = temp.path().join("out");

    let playlists = FakePlaylists::new();
    playlists.set(
        MOVIES_ENDPOINT,
        playlist(&[(movie_descriptor("tt101", "A").as_str(), "http://x/a.ts")]),
    );
    let metadata = FakeMetadata::new();
    metadata.set("tt101", movie_metadata("Film A", "2001-02-03"));

    let mut sync = orchestrator(&temp.path().join("data"), &output_dir, &playlists, &metadata).await;
    sync.run_cycle().await.unwrap();
    let paths = sync.cache().streams["tt101_A"].output_paths.clone();

    playlists.set(
        MOVIES_ENDPOINT,
        playlist(&[(movie_descriptor("tt101", "A").as_str(), "http://y/a-v2.ts")]),
    );
    let report = sync.run_cycle().await.unwrap();

    assert_eq!(report.merge.modified, 1);
    assert_eq!(report.enrichment.ready, 1);

    let record = &sync.cache().streams["tt101_A"];
    assert_eq!(record.status, StreamStatus::Exists);
    assert_eq!(record.url, "http://y/a-v2.ts");
    assert_eq!(record.output_paths, paths);
    assert_eq!(
        read(output_dir.join("media/movies/Film A (2001)/Film A (2001).strm")),
        "http://y/a-v2.ts"
    );
}

#[tokio::test]
async fn test_first_run_silent_then_notifies() {
    let temp = TempDir::new().unwrap();
    let ids = ["tt101", "tt102", "tt103"];

    let playlists = FakePlaylists::new();
    let metadata = FakeMetadata::new();
    for (i, id) in ids.iter().enumerate() {
        metadata.set(id, movie_metadata(&format!("Film {}", i), "2001-01-01"));
    }

    let set_urls = |version: &str| {
        let descriptors: Vec<String> = ids.iter().map(|id| movie_descriptor(id, "M")).collect();
        let urls: Vec<String> = ids
            .iter()
            .map(|id| format!("http://x/{}-{}.ts", id, version))
            .collect();
        let pairs: Vec<(&str, &str)> = descriptors
            .iter()
            .zip(&urls)
            .map(|(d, u)| (d.as_str(), u.as_str()))
            .collect();
        playlists.set(MOVIES_ENDPOINT, playlist(&pairs));
    };

    set_urls("v1");
    let mut sync = orchestrator(&temp.path().join("data"), &temp.path().join("out"), &playlists, &metadata).await;

    let report = sync.run_cycle().await.unwrap();
    assert_eq!(report.materialize.written, 3);
    assert!(report.materialize.notifications.is_empty());

    set_urls("v2");
    let report = sync.run_cycle().await.unwrap();
    assert_eq!(report.materialize.written, 3);
    assert_eq!(report.materialize.notifications.len(), 3);
    assert_eq!(
        report.materialize.notifications[0].to_string(),
        "Ready movie: Film 0 [tt101]"
    );
}

#[tokio::test]
async fn test_failed_fetch_reuses_cached_playlist() {
    let temp = TempDir::new().unwrap();
    let playlists = FakePlaylists::new();
    playlists.set(
        MOVIES_ENDPOINT,
        playlist(&[(movie_descriptor("tt101", "A").as_str(), "http://x/a.ts")]),
    );
    let metadata = FakeMetadata::new();

    let mut sync = orchestrator(&temp.path().join("data"), temp.path(), &playlists, &metadata).await;
    sync.run_cycle().await.unwrap();

    playlists.remove(MOVIES_ENDPOINT);
    let report = sync.run_cycle().await.unwrap();

    assert_eq!(report.playlists_loaded, 0);
    assert_eq!(report.merge.unchanged, 1);
    assert_eq!(sync.cache().streams.len(), 1);
}

#[tokio::test]
async fn test_unresolved_metadata_retried_next_cycle() {
    let temp = TempDir::new().unwrap();
    let playlists = FakePlaylists::new();
    playlists.set(
        MOVIES_ENDPOINT,
        playlist(&[(movie_descriptor("tt101", "A").as_str(), "http://x/a.ts")]),
    );
    let metadata = FakeMetadata::new();

    let mut sync = orchestrator(&temp.path().join("data"), &temp.path().join("out"), &playlists, &metadata).await;
    let report = sync.run_cycle().await.unwrap();
    assert_eq!(report.enrichment.unresolved, 1);
    assert_eq!(sync.cache().streams["tt101_A"].status, StreamStatus::New);

    metadata.set("tt101", movie_metadata("Film A", "2001-02-03"));
    let report = sync.run_cycle().await.unwrap();
    assert_eq!(report.metadata_resolved, 1);
    assert_eq!(sync.cache().streams["tt101_A"].status, StreamStatus::Exists);
    assert_eq!(metadata.lookups(), 2);
}

#[tokio::test]
async fn test_duplicate_across_endpoints_settles_on_first_endpoint() {
    let temp = TempDir::new().unwrap();
    let twin = movie_descriptor("tt700", "Twin");

    let playlists = FakePlaylists::new();
    playlists.set(TV_ENDPOINT, playlist(&[(twin.as_str(), "http://x/tv.ts")]));
    playlists.set(MOVIES_ENDPOINT, playlist(&[(twin.as_str(), "http://x/movie.ts")]));
    let metadata = FakeMetadata::new();
    metadata.set("tt700", movie_metadata("Twin", "2007-07-07"));

    let output_dir = temp.path().join("out");
    let mut sync = orchestrator(&temp.path().join("data"), &output_dir, &playlists, &metadata).await;

    let report = sync.run_cycle().await.unwrap();
    assert_eq!(report.merge.created, 1);
    assert_eq!(report.merge.duplicates, 1);
    assert_eq!(report.materialize.written, 1);

    for _ in 0..3 {
        let report = sync.run_cycle().await.unwrap();
        assert_eq!(report.merge.modified, 0);
        assert_eq!(report.merge.unchanged, 1);
        assert_eq!(report.materialize.written, 0);
        assert!(report.materialize.notifications.is_empty());
    }

    let record = &sync.cache().streams["tt700_Twin"];
    assert_eq!(record.status, StreamStatus::Exists);
    assert_eq!(record.url, "http://x/tv.ts");
    assert_eq!(
        read(output_dir.join("media/movies/Twin (2007)/Twin (2007).strm")),
        "http://x/tv.ts"
    );
}

#[tokio::test]
async fn test_unconfigured_cached_endpoint_is_ignored() {
    let temp = TempDir::new().unwrap();
    let data_dir = temp.path().join("data");

    // Left behind by an earlier configuration with more TV lists
    std::fs::create_dir_all(&data_dir).unwrap();
    let stale = json!({
        "tvshows/99": ["#EXTM3U", movie_descriptor("tt900", "Gone"), "http://x/gone.ts"]
    });
    std::fs::write(data_dir.join("playlists.json"), stale.to_string()).unwrap();

    let playlists = FakePlaylists::new();
    playlists.set(
        MOVIES_ENDPOINT,
        playlist(&[(movie_descriptor("tt101", "A").as_str(), "http://x/a.ts")]),
    );
    let metadata = FakeMetadata::new();

    let mut sync = orchestrator(&data_dir, temp.path(), &playlists, &metadata).await;
    let report = sync.run_cycle().await.unwrap();

    assert_eq!(report.merge.created, 1);
    assert!(!sync.cache().streams.contains_key("tt900_Gone"));
    assert!(!sync.cache().metadata.contains_key("tt900"));
    assert_eq!(
        sync.cache().playlists.keys().collect::<Vec<_>>(),
        vec![MOVIES_ENDPOINT]
    );
    assert!(!read(data_dir.join("playlists.json")).contains("tvshows/99"));
}
