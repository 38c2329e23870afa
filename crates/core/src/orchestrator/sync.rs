//! Playlist sync: resolve every source track, then copy the matches.

use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use tracing::{info, warn};

use super::batch::{BatchReport, BatchRunner};
use super::config::SyncConfig;
use super::pagination::{fetch_all_pages, Page};
use super::throttle::Throttle;
use super::types::{SourcePlaylist, SyncError, SyncReport};
use crate::catalog::{PlaylistSource, PlaylistWriter};
use crate::metrics;
use crate::resolver::{ResolveError, TrackResolver};

/// Why one source track did not make it.
#[derive(Debug, Error)]
enum TrackFailure {
    #[error("no acceptable match")]
    NoMatch,
    #[error(transparent)]
    Invalid(#[from] ResolveError),
}

/// Copies playlists into a destination catalog.
pub struct PlaylistSync {
    resolver: Arc<TrackResolver>,
    writer: Arc<dyn PlaylistWriter>,
    throttle: Arc<dyn Throttle>,
    config: SyncConfig,
}

impl PlaylistSync {
    pub fn new(
        resolver: Arc<TrackResolver>,
        writer: Arc<dyn PlaylistWriter>,
        throttle: Arc<dyn Throttle>,
        config: SyncConfig,
    ) -> Self {
        Self {
            resolver,
            writer,
            throttle,
            config,
        }
    }

    /// Sync a playlist into a newly created destination playlist.
    ///
    /// Fails only when the playlist is unusable or the destination cannot
    /// be created. Tracks that cannot be resolved or added are reported in
    /// [`SyncReport::failed_songs`].
    pub async fn sync_playlist(&self, source: &SourcePlaylist) -> Result<SyncReport, SyncError> {
        if source.name.trim().is_empty() {
            return Err(SyncError::InvalidPlaylist("playlist name is empty".to_string()));
        }

        let started = Instant::now();
        info!(
            playlist = %source.name,
            tracks = source.tracks.len(),
            "Starting playlist sync"
        );

        let destination_id = match self
            .writer
            .create_playlist(&source.name, source.description.as_deref())
            .await
        {
            Ok(id) => id,
            Err(e) => {
                metrics::SYNC_DURATION
                    .with_label_values(&["failed"])
                    .observe(started.elapsed().as_secs_f64());
                return Err(SyncError::CreatePlaylist(e));
            }
        };

        // Resolution
        let resolver = &self.resolver;
        let resolutions = BatchRunner::new(self.config.resolve_batches(), self.throttle.clone())
            .run_batches(source.tracks.clone(), |query| async move {
                match resolver.resolve_track(&query).await? {
                    Some(resolved) => Ok((query, resolved.remote_id)),
                    None => Err(TrackFailure::NoMatch),
                }
            })
            .await;
        let resolutions = BatchReport::from_outcomes(resolutions);
        for query in &resolutions.failed {
            warn!(name = %query.name, artist = %query.artist, "Track not resolved");
        }
        let mut failed_songs = resolutions.failed;

        // Mutation
        let writer = &self.writer;
        let destination = destination_id.as_str();
        let additions = BatchRunner::new(self.config.add_batches(), self.throttle.clone())
            .run_chunks(resolutions.succeeded, |chunk| async move {
                let ids: Vec<String> = chunk.into_iter().map(|(_, id)| id).collect();
                writer.add_tracks_to_playlist(destination, &ids).await
            })
            .await;
        let additions = BatchReport::from_outcomes(additions);
        let tracks_added = additions.succeeded.len();
        failed_songs.extend(additions.failed.into_iter().map(|(query, _)| query));

        let report = SyncReport {
            destination_id,
            tracks_added,
            total_tracks: source.tracks.len(),
            failed_count: failed_songs.len(),
            failed_songs,
        };

        metrics::SYNC_DURATION
            .with_label_values(&["completed"])
            .observe(started.elapsed().as_secs_f64());
        info!(
            playlist = %source.name,
            destination = %report.destination_id,
            added = report.tracks_added,
            failed = report.failed_count,
            "Playlist sync finished"
        );

        Ok(report)
    }

    /// Fetch a playlist from `source` and sync it.
    ///
    /// Track pages are read until the last one or the first failing page;
    /// a truncated listing is synced as far as it got.
    pub async fn sync_remote_playlist(
        &self,
        source: &dyn PlaylistSource,
        playlist_id: &str,
    ) -> Result<SyncReport, SyncError> {
        let metadata = source
            .fetch_playlist_metadata(playlist_id)
            .await
            .map_err(|e| SyncError::SourceMetadata {
                playlist_id: playlist_id.to_string(),
                source: e,
            })?;

        let fetched = fetch_all_pages(
            None,
            self.throttle.as_ref(),
            self.config.page_delay(),
            |cursor| async move {
                source
                    .fetch_tracks_page(playlist_id, cursor.as_deref())
                    .await
                    .map(Page::from)
            },
        )
        .await;

        if let Some(error) = &fetched.interrupted {
            warn!(
                playlist_id,
                fetched = fetched.items.len(),
                error = %error,
                "Source playlist listing truncated"
            );
        }

        let mut playlist = SourcePlaylist::new(
            metadata.name,
            fetched.items.iter().map(|t| t.to_query()).collect(),
        );
        if let Some(description) = metadata.description {
            playlist = playlist.with_description(description);
        }

        self.sync_playlist(&playlist).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogError;
    use crate::testing::{fixtures, MockCatalog, RecordingThrottle};

    fn setup() -> (Arc<MockCatalog>, Arc<RecordingThrottle>, PlaylistSync) {
        let catalog = Arc::new(MockCatalog::new());
        let throttle = Arc::new(RecordingThrottle::new());
        let resolver = Arc::new(TrackResolver::new(catalog.clone()));
        let sync = PlaylistSync::new(resolver, catalog.clone(), throttle.clone(), SyncConfig::default());
        (catalog, throttle, sync)
    }

    #[tokio::test]
    async fn test_sync_reports_unresolved_tracks() {
        let (catalog, _, sync) = setup();
        catalog
            .set_search_results("Halo Beyoncé", vec![fixtures::catalog_track("d1", "Halo", "Beyoncé")])
            .await;

        let source = SourcePlaylist::new(
            "Mix",
            vec![
                fixtures::track_query("Halo", "Beyoncé"),
                fixtures::track_query("Unknown", "Nobody"),
                fixtures::track_query("", "Nobody"),
            ],
        );
        let report = sync.sync_playlist(&source).await.unwrap();

        assert_eq!(report.destination_id, "created-1");
        assert_eq!(report.tracks_added, 1);
        assert_eq!(report.total_tracks, 3);
        assert_eq!(report.failed_count, 2);
        assert_eq!(report.failed_songs[0].name, "Unknown");
        assert_eq!(catalog.added_tracks("created-1").await, vec!["d1"]);
    }

    #[tokio::test]
    async fn test_create_failure_is_a_hard_error() {
        let (catalog, _, sync) = setup();
        catalog.set_next_error(CatalogError::RateLimitExceeded).await;

        let source = SourcePlaylist::new("Mix", vec![fixtures::track_query("Halo", "Beyoncé")]);
        let result = sync.sync_playlist(&source).await;
        assert!(matches!(result, Err(SyncError::CreatePlaylist(_))));
    }

    #[tokio::test]
    async fn test_empty_name_is_rejected() {
        let (catalog, _, sync) = setup();
        let result = sync.sync_playlist(&SourcePlaylist::new(" ", Vec::new())).await;
        assert!(matches!(result, Err(SyncError::InvalidPlaylist(_))));
        assert!(catalog.recorded_calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_empty_playlist_is_created() {
        let (catalog, throttle, sync) = setup();
        let report = sync.sync_playlist(&SourcePlaylist::new("Empty", Vec::new())).await.unwrap();

        assert!(report.is_complete());
        assert_eq!(report.total_tracks, 0);
        assert_eq!(catalog.created_playlists().await.len(), 1);
        assert!(throttle.pauses().is_empty());
    }

    #[tokio::test]
    async fn test_description_is_copied_to_destination() {
        let (catalog, _, sync) = setup();
        let source = SourcePlaylist::new("Mix", Vec::new()).with_description("Songs for the road");

        sync.sync_playlist(&source).await.unwrap();

        let created = catalog.created_playlists().await;
        assert_eq!(created[0].2.as_deref(), Some("Songs for the road"));
    }

    #[tokio::test]
    async fn test_missing_remote_source() {
        let (catalog, _, sync) = setup();
        let result = sync.sync_remote_playlist(catalog.as_ref(), "missing").await;
        assert!(matches!(
            result,
            Err(SyncError::SourceMetadata { source, .. }) if source.is_not_found()
        ));
    }
}
