//! Playlist sync integration tests.
//!
//! These tests drive a full sync through the resolver and the batch
//! orchestrator against the mock catalog:
//! create destination -> resolve in batches -> add in chunks -> report

use std::sync::Arc;
use std::time::Duration;

use tunebridge_core::{
    matching::CatalogTrack,
    testing::{fixtures, MockCatalog, RecordedCatalogCall, RecordingThrottle},
    PlaylistSync, SourcePlaylist, SyncConfig, TrackQuery, TrackResolver,
};

/// Test helper wiring a sync engine to a mock catalog.
struct TestHarness {
    catalog: Arc<MockCatalog>,
    throttle: Arc<RecordingThrottle>,
    sync: PlaylistSync,
}

impl TestHarness {
    fn new() -> Self {
        Self::with_config(SyncConfig::default())
    }

    fn with_config(config: SyncConfig) -> Self {
        let catalog = Arc::new(MockCatalog::new());
        let throttle = Arc::new(RecordingThrottle::new());
        let resolver = Arc::new(TrackResolver::new(catalog.clone()));
        let sync = PlaylistSync::new(resolver, catalog.clone(), throttle.clone(), config);

        Self {
            catalog,
            throttle,
            sync,
        }
    }

    /// Make every track findable under its own "<name> <artist>" query.
    async fn index(&self, tracks: &[CatalogTrack]) {
        for track in tracks {
            self.catalog
                .set_search_results(
                    &format!("{} {}", track.name, track.artist),
                    vec![track.clone()],
                )
                .await;
        }
    }
}

#[tokio::test]
async fn test_featured_artist_suffix_resolves_to_original() {
    let harness = TestHarness::new();
    harness
        .catalog
        .set_search_results(
            "Red Nosed Artist A",
            vec![
                fixtures::catalog_track("karaoke", "Rednosed (Karaoke)", "Artist A Tribute"),
                fixtures::catalog_track("original", "Rednosed", "Artist A"),
            ],
        )
        .await;

    let source = SourcePlaylist::new(
        "Holiday",
        vec![TrackQuery::new("Red Nosed (feat. X)", "Artist A")],
    );
    let report = harness.sync.sync_playlist(&source).await.unwrap();

    assert!(report.is_complete());
    assert_eq!(report.tracks_added, 1);
    assert_eq!(
        harness.catalog.added_tracks(&report.destination_id).await,
        vec!["original"]
    );
}

#[tokio::test]
async fn test_resolution_runs_in_batches_with_pauses_between() {
    let harness = TestHarness::new();
    let tracks = fixtures::numbered_tracks("src", 12);
    harness.index(&tracks).await;

    let report = harness
        .sync
        .sync_playlist(&fixtures::source_playlist("Twelve", &tracks))
        .await
        .unwrap();

    assert_eq!(report.total_tracks, 12);
    assert_eq!(report.tracks_added, 12);
    assert_eq!(report.failed_count, 0);

    // 12 items in batches of 5 -> 3 batches, 2 pauses; all adds fit one chunk
    assert_eq!(
        harness.throttle.pauses(),
        vec![Duration::from_secs(1), Duration::from_secs(1)]
    );

    // Order of additions follows the source playlist
    let expected: Vec<String> = tracks.iter().map(|t| t.id.clone()).collect();
    assert_eq!(
        harness.catalog.added_tracks(&report.destination_id).await,
        expected
    );
}

#[tokio::test]
async fn test_additions_are_chunked() {
    let harness = TestHarness::with_config(SyncConfig {
        resolve_batch_size: 100,
        add_delay_ms: 50,
        ..Default::default()
    });
    let tracks = fixtures::numbered_tracks("src", 60);
    harness.index(&tracks).await;

    let report = harness
        .sync
        .sync_playlist(&fixtures::source_playlist("Sixty", &tracks))
        .await
        .unwrap();
    assert_eq!(report.tracks_added, 60);

    let add_sizes: Vec<usize> = harness
        .catalog
        .recorded_calls()
        .await
        .into_iter()
        .filter_map(|call| match call {
            RecordedCatalogCall::AddTracks { track_ids, .. } => Some(track_ids.len()),
            _ => None,
        })
        .collect();
    assert_eq!(add_sizes, vec![25, 25, 10]);
    assert_eq!(
        harness.throttle.pauses(),
        vec![Duration::from_millis(50), Duration::from_millis(50)]
    );
}

#[tokio::test]
async fn test_rejected_chunk_is_reported_per_track() {
    let harness = TestHarness::with_config(SyncConfig {
        add_batch_size: 2,
        ..Default::default()
    });
    let tracks = fixtures::numbered_tracks("src", 5);
    harness.index(&tracks).await;
    harness.catalog.reject_track("src-3").await;

    let report = harness
        .sync
        .sync_playlist(&fixtures::source_playlist("Five", &tracks))
        .await
        .unwrap();

    // Chunks are [1,2] [3,4] [5]; the second one fails as a whole
    assert_eq!(report.tracks_added, 3);
    assert_eq!(report.failed_count, 2);
    let failed: Vec<&str> = report.failed_songs.iter().map(|q| q.name.as_str()).collect();
    assert_eq!(failed, vec!["Song 3", "Song 4"]);
}

#[tokio::test]
async fn test_sync_remote_playlist_follows_all_pages() {
    let harness = TestHarness::new();
    let tracks = fixtures::numbered_tracks("src", 7);
    harness.index(&tracks).await;
    harness
        .catalog
        .add_playlist("remote-1", "Road Trip", tracks.clone(), 3)
        .await;

    let report = harness
        .sync
        .sync_remote_playlist(harness.catalog.as_ref(), "remote-1")
        .await
        .unwrap();

    assert_eq!(harness.catalog.tracks_page_calls("remote-1").await, 3);
    assert_eq!(report.total_tracks, 7);
    assert_eq!(report.tracks_added, 7);

    let created = harness.catalog.created_playlists().await;
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].1, "Road Trip");
}

#[tokio::test]
async fn test_sync_remote_playlist_with_truncated_listing() {
    let harness = TestHarness::new();
    let tracks = fixtures::numbered_tracks("src", 6);
    harness.index(&tracks).await;
    harness
        .catalog
        .add_playlist("remote-1", "Partial", tracks, 2)
        .await;
    harness.catalog.fail_page("remote-1", 2).await;

    let report = harness
        .sync
        .sync_remote_playlist(harness.catalog.as_ref(), "remote-1")
        .await
        .unwrap();

    // The first two pages made it through
    assert_eq!(report.total_tracks, 4);
    assert_eq!(report.tracks_added, 4);
}
