//! Mock remote catalog for testing.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::catalog::{
    CatalogError, CatalogSearch, PlaylistMetadata, PlaylistSource, PlaylistWriter, SearchKind,
    TracksPage,
};
use crate::matching::CatalogTrack;

/// A recorded catalog call for test assertions.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCatalogCall {
    Search {
        query: String,
        kind: SearchKind,
        limit: u32,
    },
    FetchTracksPage {
        playlist_id: String,
        cursor: Option<String>,
    },
    FetchPlaylistMetadata {
        playlist_id: String,
    },
    CreatePlaylist {
        name: String,
    },
    AddTracks {
        playlist_id: String,
        track_ids: Vec<String>,
    },
}

/// A playlist served by the mock, already split into pages.
#[derive(Debug, Clone)]
struct MockPlaylist {
    metadata: PlaylistMetadata,
    pages: Vec<Vec<CatalogTrack>>,
}

/// Mock implementation of all catalog traits.
///
/// Provides controllable behavior for testing:
/// - Search results keyed by the exact query string
/// - Paginated playlists (cursors are `page:<n>`)
/// - Created playlists and added tracks for assertions
/// - Error injection, per-page failures and artificial latency
///
/// Unknown playlists answer with [`CatalogError::NotFound`].
///
/// # Example
///
/// ```rust,ignore
/// use tunebridge_core::testing::{fixtures, MockCatalog};
///
/// let catalog = MockCatalog::new();
/// catalog.add_playlist("pl-1", "Road Trip", fixtures::numbered_tracks("t", 250), 100).await;
///
/// let page = catalog.fetch_tracks_page("pl-1", None).await?;
/// assert_eq!(page.next_cursor.as_deref(), Some("page:1"));
/// ```
#[derive(Debug)]
pub struct MockCatalog {
    /// Search results by query string.
    search_results: Arc<RwLock<HashMap<String, Vec<CatalogTrack>>>>,
    /// Playlists by id.
    playlists: Arc<RwLock<HashMap<String, MockPlaylist>>>,
    /// Pages that fail, by (playlist id, page index).
    failing_pages: Arc<RwLock<HashSet<(String, usize)>>>,
    /// Playlists whose metadata fetch fails with a server error.
    broken_playlists: Arc<RwLock<HashSet<String>>>,
    /// Track ids that make an add request fail.
    rejected_tracks: Arc<RwLock<HashSet<String>>>,
    /// Created playlists as (id, name, description).
    created: Arc<RwLock<Vec<(String, String, Option<String>)>>>,
    /// Tracks added per playlist, in order.
    added: Arc<RwLock<HashMap<String, Vec<String>>>>,
    /// Recorded calls.
    calls: Arc<RwLock<Vec<RecordedCatalogCall>>>,
    /// If set, the next operation will fail with this error.
    next_error: Arc<RwLock<Option<CatalogError>>>,
    /// Delay applied to every call.
    latency: Arc<RwLock<Duration>>,
}

impl Default for MockCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl MockCatalog {
    /// Create a new empty mock catalog.
    pub fn new() -> Self {
        Self {
            search_results: Arc::new(RwLock::new(HashMap::new())),
            playlists: Arc::new(RwLock::new(HashMap::new())),
            failing_pages: Arc::new(RwLock::new(HashSet::new())),
            broken_playlists: Arc::new(RwLock::new(HashSet::new())),
            rejected_tracks: Arc::new(RwLock::new(HashSet::new())),
            created: Arc::new(RwLock::new(Vec::new())),
            added: Arc::new(RwLock::new(HashMap::new())),
            calls: Arc::new(RwLock::new(Vec::new())),
            next_error: Arc::new(RwLock::new(None)),
            latency: Arc::new(RwLock::new(Duration::ZERO)),
        }
    }

    // =========================================================================
    // Search Configuration
    // =========================================================================

    /// Set the results returned for an exact query string.
    pub async fn set_search_results(&self, query: &str, results: Vec<CatalogTrack>) {
        self.search_results
            .write()
            .await
            .insert(query.to_string(), results);
    }

    // =========================================================================
    // Playlist Configuration
    // =========================================================================

    /// Add a playlist whose tracks are served `page_size` at a time.
    pub async fn add_playlist(
        &self,
        id: &str,
        name: &str,
        tracks: Vec<CatalogTrack>,
        page_size: usize,
    ) {
        let metadata = PlaylistMetadata {
            id: id.to_string(),
            name: name.to_string(),
            description: None,
            track_count: Some(tracks.len() as u32),
        };
        let pages = if tracks.is_empty() {
            vec![Vec::new()]
        } else {
            tracks.chunks(page_size.max(1)).map(<[_]>::to_vec).collect()
        };

        self.playlists
            .write()
            .await
            .insert(id.to_string(), MockPlaylist { metadata, pages });
    }

    /// Make one page of a playlist fail.
    pub async fn fail_page(&self, playlist_id: &str, page: usize) {
        self.failing_pages
            .write()
            .await
            .insert((playlist_id.to_string(), page));
    }

    /// Make a playlist's metadata fetch fail with a server error.
    pub async fn break_playlist(&self, playlist_id: &str) {
        self.broken_playlists
            .write()
            .await
            .insert(playlist_id.to_string());
    }

    /// Make any add request containing `track_id` fail.
    pub async fn reject_track(&self, track_id: &str) {
        self.rejected_tracks
            .write()
            .await
            .insert(track_id.to_string());
    }

    /// Delay every call by `latency`.
    pub async fn set_latency(&self, latency: Duration) {
        *self.latency.write().await = latency;
    }

    // =========================================================================
    // Assertions
    // =========================================================================

    /// Get all recorded calls.
    pub async fn recorded_calls(&self) -> Vec<RecordedCatalogCall> {
        self.calls.read().await.clone()
    }

    /// Clear recorded calls.
    pub async fn clear_recorded(&self) {
        self.calls.write().await.clear();
    }

    /// Number of track page fetches for one playlist.
    pub async fn tracks_page_calls(&self, playlist_id: &str) -> usize {
        self.calls
            .read()
            .await
            .iter()
            .filter(|c| {
                matches!(c, RecordedCatalogCall::FetchTracksPage { playlist_id: id, .. } if id == playlist_id)
            })
            .count()
    }

    /// Created playlists as (id, name, description).
    pub async fn created_playlists(&self) -> Vec<(String, String, Option<String>)> {
        self.created.read().await.clone()
    }

    /// Track ids added to a playlist, in order.
    pub async fn added_tracks(&self, playlist_id: &str) -> Vec<String> {
        self.added
            .read()
            .await
            .get(playlist_id)
            .cloned()
            .unwrap_or_default()
    }

    // =========================================================================
    // Error Injection
    // =========================================================================

    /// Configure the next operation to fail with the given error.
    pub async fn set_next_error(&self, error: CatalogError) {
        *self.next_error.write().await = Some(error);
    }

    /// Wait out the latency, then take the next error if set.
    async fn begin_call(&self) -> Result<(), CatalogError> {
        let latency = *self.latency.read().await;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        match self.next_error.write().await.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Record a call.
    async fn record(&self, call: RecordedCatalogCall) {
        self.calls.write().await.push(call);
    }
}

fn parse_cursor(cursor: Option<&str>) -> Result<usize, CatalogError> {
    match cursor {
        None => Ok(0),
        Some(c) => c
            .strip_prefix("page:")
            .and_then(|n| n.parse().ok())
            .ok_or_else(|| CatalogError::ParseError(format!("bad cursor {}", c))),
    }
}

#[async_trait]
impl CatalogSearch for MockCatalog {
    async fn search_catalog(
        &self,
        query: &str,
        kind: SearchKind,
        limit: u32,
    ) -> Result<Vec<CatalogTrack>, CatalogError> {
        self.begin_call().await?;

        self.record(RecordedCatalogCall::Search {
            query: query.to_string(),
            kind,
            limit,
        })
        .await;

        Ok(self
            .search_results
            .read()
            .await
            .get(query)
            .map(|results| results.iter().take(limit as usize).cloned().collect())
            .unwrap_or_default())
    }
}

#[async_trait]
impl PlaylistSource for MockCatalog {
    async fn fetch_tracks_page(
        &self,
        playlist_id: &str,
        cursor: Option<&str>,
    ) -> Result<TracksPage, CatalogError> {
        self.begin_call().await?;

        self.record(RecordedCatalogCall::FetchTracksPage {
            playlist_id: playlist_id.to_string(),
            cursor: cursor.map(str::to_string),
        })
        .await;

        let index = parse_cursor(cursor)?;
        if self
            .failing_pages
            .read()
            .await
            .contains(&(playlist_id.to_string(), index))
        {
            return Err(CatalogError::ApiError {
                status: 502,
                message: format!("page {} unavailable", index),
            });
        }

        let playlists = self.playlists.read().await;
        let playlist = playlists
            .get(playlist_id)
            .ok_or_else(|| CatalogError::NotFound(format!("Playlist {} not found", playlist_id)))?;
        let tracks = playlist
            .pages
            .get(index)
            .cloned()
            .ok_or_else(|| CatalogError::ParseError(format!("no page {}", index)))?;
        let next_cursor = (index + 1 < playlist.pages.len()).then(|| format!("page:{}", index + 1));

        Ok(TracksPage {
            tracks,
            next_cursor,
        })
    }

    async fn fetch_playlist_metadata(
        &self,
        playlist_id: &str,
    ) -> Result<PlaylistMetadata, CatalogError> {
        self.begin_call().await?;

        self.record(RecordedCatalogCall::FetchPlaylistMetadata {
            playlist_id: playlist_id.to_string(),
        })
        .await;

        if self.broken_playlists.read().await.contains(playlist_id) {
            return Err(CatalogError::ApiError {
                status: 500,
                message: "internal server error".to_string(),
            });
        }

        self.playlists
            .read()
            .await
            .get(playlist_id)
            .map(|p| p.metadata.clone())
            .ok_or_else(|| CatalogError::NotFound(format!("Playlist {} not found", playlist_id)))
    }
}

#[async_trait]
impl PlaylistWriter for MockCatalog {
    async fn create_playlist(
        &self,
        name: &str,
        description: Option<&str>,
    ) -> Result<String, CatalogError> {
        self.begin_call().await?;

        self.record(RecordedCatalogCall::CreatePlaylist {
            name: name.to_string(),
        })
        .await;

        let mut created = self.created.write().await;
        let id = format!("created-{}", created.len() + 1);
        created.push((
            id.clone(),
            name.to_string(),
            description.map(str::to_string),
        ));
        self.added.write().await.insert(id.clone(), Vec::new());

        Ok(id)
    }

    async fn add_tracks_to_playlist(
        &self,
        playlist_id: &str,
        track_ids: &[String],
    ) -> Result<(), CatalogError> {
        self.begin_call().await?;

        self.record(RecordedCatalogCall::AddTracks {
            playlist_id: playlist_id.to_string(),
            track_ids: track_ids.to_vec(),
        })
        .await;

        let rejected = self.rejected_tracks.read().await;
        if let Some(id) = track_ids.iter().find(|id| rejected.contains(id.as_str())) {
            return Err(CatalogError::ApiError {
                status: 400,
                message: format!("invalid track {}", id),
            });
        }

        let mut added = self.added.write().await;
        let tracks = added
            .get_mut(playlist_id)
            .ok_or_else(|| CatalogError::NotFound(format!("Playlist {} not found", playlist_id)))?;
        tracks.extend_from_slice(track_ids);

        Ok(())
    }
}
