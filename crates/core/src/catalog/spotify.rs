//! Spotify Web API client.
//!
//! The caller supplies a bearer token; acquiring and refreshing it is not
//! this client's job. Requests are spaced by a minimum interval, and a 429
//! surfaces as [`CatalogError::RateLimitExceeded`] without retrying.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

use super::types::{PlaylistMetadata, SearchKind, TracksPage};
use super::{CatalogError, CatalogSearch, PlaylistSource, PlaylistWriter};
use crate::matching::CatalogTrack;
use crate::metrics;

/// Most tracks a single add request accepts.
pub const MAX_TRACKS_PER_ADD: usize = 100;
/// Most results a search request returns.
const MAX_SEARCH_LIMIT: u32 = 50;
/// Page size used for playlist track listings.
const TRACKS_PAGE_SIZE: u32 = 100;

/// Spotify client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifyConfig {
    /// OAuth bearer token (required).
    pub access_token: String,
    /// Minimum delay between two requests in milliseconds.
    #[serde(default = "default_min_interval")]
    pub min_interval_ms: u64,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Market used to filter search results (ISO 3166-1 alpha-2).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market: Option<String>,
    /// Base URL (default: https://api.spotify.com/v1).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

fn default_min_interval() -> u64 {
    100
}

fn default_timeout() -> u64 {
    30
}

impl SpotifyConfig {
    /// Config with defaults and the given token.
    pub fn with_token(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            min_interval_ms: default_min_interval(),
            timeout_secs: default_timeout(),
            market: None,
            base_url: None,
        }
    }
}

/// Spotify Web API client.
pub struct SpotifyClient {
    client: Client,
    base_url: String,
    access_token: String,
    market: Option<String>,
    last_request: Arc<Mutex<Option<Instant>>>,
    min_interval: Duration,
}

impl SpotifyClient {
    /// Create a new Spotify client.
    pub fn new(config: SpotifyConfig) -> Result<Self, CatalogError> {
        if config.access_token.trim().is_empty() {
            return Err(CatalogError::NotConfigured(
                "Spotify access token is required".to_string(),
            ));
        }

        let client = Client::builder()
            .user_agent(concat!("tunebridge/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        let base_url = config
            .base_url
            .unwrap_or_else(|| "https://api.spotify.com/v1".to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            client,
            base_url,
            access_token: config.access_token,
            market: config.market,
            last_request: Arc::new(Mutex::new(None)),
            min_interval: Duration::from_millis(config.min_interval_ms),
        })
    }

    /// Wait for the minimum interval if needed.
    async fn wait_for_rate_limit(&self) {
        let mut last = self.last_request.lock().await;

        if let Some(last_time) = *last {
            let elapsed = last_time.elapsed();
            if elapsed < self.min_interval {
                let wait_time = self.min_interval - elapsed;
                debug!("Spotify rate limit: waiting {:?}", wait_time);
                sleep(wait_time).await;
            }
        }

        *last = Some(Instant::now());
    }

    /// Send a request and map error statuses. `resource` names the entity
    /// for `NotFound`.
    async fn send(
        &self,
        operation: &'static str,
        request: RequestBuilder,
        resource: &str,
    ) -> Result<Response, CatalogError> {
        self.wait_for_rate_limit().await;

        let response = match request.bearer_auth(&self.access_token).send().await {
            Ok(response) => response,
            Err(e) => {
                metrics::CATALOG_REQUESTS
                    .with_label_values(&[operation, "error"])
                    .inc();
                return Err(e.into());
            }
        };

        let status = response.status();
        let outcome = if status.is_success() {
            "success"
        } else if status == 404 {
            "not_found"
        } else {
            "error"
        };
        metrics::CATALOG_REQUESTS
            .with_label_values(&[operation, outcome])
            .inc();

        if status == 429 {
            warn!(operation, "Spotify rate limit exceeded");
            return Err(CatalogError::RateLimitExceeded);
        }
        if status == 404 {
            return Err(CatalogError::NotFound(resource.to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CatalogError::ApiError {
                status: status.as_u16(),
                message: body,
            });
        }

        Ok(response)
    }

    fn playlist_url(&self, playlist_id: &str) -> String {
        format!(
            "{}/playlists/{}",
            self.base_url,
            urlencoding::encode(playlist_id)
        )
    }
}

/// Build the search `q` parameter.
fn search_query(query: &str, kind: SearchKind) -> String {
    match kind {
        SearchKind::Track => query.to_string(),
        SearchKind::Artist => format!("artist:\"{}\"", query.replace('"', "")),
    }
}

#[async_trait]
impl CatalogSearch for SpotifyClient {
    async fn search_catalog(
        &self,
        query: &str,
        kind: SearchKind,
        limit: u32,
    ) -> Result<Vec<CatalogTrack>, CatalogError> {
        let url = format!("{}/search", self.base_url);
        let limit = limit.clamp(1, MAX_SEARCH_LIMIT);
        let q = search_query(query, kind);

        debug!("Spotify search: q='{}', limit={}", q, limit);

        let mut request = self.client.get(&url).query(&[
            ("q", q.as_str()),
            ("type", "track"),
            ("limit", &limit.to_string()),
        ]);
        if let Some(market) = &self.market {
            request = request.query(&[("market", market.as_str())]);
        }

        let response = self.send("search", request, query).await?;
        let result: SpSearchResponse = response.json().await.map_err(|e| {
            CatalogError::ParseError(format!("Failed to parse search response: {}", e))
        })?;

        Ok(result
            .tracks
            .map(|page| page.items.into_iter().filter_map(SpTrack::into_track).collect())
            .unwrap_or_default())
    }
}

#[async_trait]
impl PlaylistSource for SpotifyClient {
    async fn fetch_tracks_page(
        &self,
        playlist_id: &str,
        cursor: Option<&str>,
    ) -> Result<TracksPage, CatalogError> {
        // The cursor is the absolute `next` URL of the previous page.
        let request = match cursor {
            Some(next) => self.client.get(next),
            None => self
                .client
                .get(format!("{}/tracks", self.playlist_url(playlist_id)))
                .query(&[("limit", TRACKS_PAGE_SIZE.to_string())]),
        };

        debug!(playlist_id, cursor = ?cursor, "Spotify fetch tracks page");

        let response = self.send("fetch_tracks_page", request, playlist_id).await?;
        let page: SpPlaylistTracksPage = response.json().await.map_err(|e| {
            CatalogError::ParseError(format!("Failed to parse playlist tracks: {}", e))
        })?;

        Ok(page.into())
    }

    async fn fetch_playlist_metadata(
        &self,
        playlist_id: &str,
    ) -> Result<PlaylistMetadata, CatalogError> {
        let request = self
            .client
            .get(self.playlist_url(playlist_id))
            .query(&[("fields", "id,name,description,tracks.total")]);

        debug!(playlist_id, "Spotify fetch playlist metadata");

        let response = self
            .send("fetch_playlist_metadata", request, playlist_id)
            .await?;
        let playlist: SpPlaylist = response.json().await.map_err(|e| {
            CatalogError::ParseError(format!("Failed to parse playlist: {}", e))
        })?;

        Ok(playlist.into())
    }
}

#[async_trait]
impl PlaylistWriter for SpotifyClient {
    async fn create_playlist(
        &self,
        name: &str,
        description: Option<&str>,
    ) -> Result<String, CatalogError> {
        let url = format!("{}/me/playlists", self.base_url);
        let body = json!({
            "name": name,
            "description": description.unwrap_or_default(),
            "public": false,
        });

        debug!(name, "Spotify create playlist");

        let response = self
            .send("create_playlist", self.client.post(&url).json(&body), name)
            .await?;
        let created: SpCreatedPlaylist = response.json().await.map_err(|e| {
            CatalogError::ParseError(format!("Failed to parse created playlist: {}", e))
        })?;

        Ok(created.id)
    }

    async fn add_tracks_to_playlist(
        &self,
        playlist_id: &str,
        track_ids: &[String],
    ) -> Result<(), CatalogError> {
        let url = format!("{}/tracks", self.playlist_url(playlist_id));

        for chunk in track_ids.chunks(MAX_TRACKS_PER_ADD) {
            let uris: Vec<String> = chunk.iter().map(|id| track_uri(id)).collect();
            debug!(playlist_id, count = uris.len(), "Spotify add tracks");

            self.send(
                "add_tracks",
                self.client.post(&url).json(&json!({ "uris": uris })),
                playlist_id,
            )
            .await?;
        }

        Ok(())
    }
}

/// Track URI from a bare id. Ids that already are URIs pass through.
fn track_uri(id: &str) -> String {
    if id.starts_with("spotify:") {
        id.to_string()
    } else {
        format!("spotify:track:{}", id)
    }
}

// ============================================================================
// Spotify API Response Types (private)
// ============================================================================

#[derive(Debug, Deserialize)]
struct SpSearchResponse {
    #[serde(default)]
    tracks: Option<SpPaging<SpTrack>>,
}

#[derive(Debug, Deserialize)]
struct SpPaging<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct SpTrack {
    /// Local files have no id.
    #[serde(default)]
    id: Option<String>,
    name: String,
    #[serde(default)]
    artists: Vec<SpArtist>,
    #[serde(default)]
    album: Option<SpAlbum>,
    #[serde(default)]
    duration_ms: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct SpArtist {
    name: String,
}

#[derive(Debug, Deserialize)]
struct SpAlbum {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct SpPlaylistTracksPage {
    #[serde(default)]
    items: Vec<SpPlaylistItem>,
    #[serde(default)]
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SpPlaylistItem {
    /// Null for removed or unavailable tracks.
    #[serde(default)]
    track: Option<SpTrack>,
}

#[derive(Debug, Deserialize)]
struct SpPlaylist {
    id: String,
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    tracks: Option<SpTrackTotal>,
}

#[derive(Debug, Deserialize)]
struct SpTrackTotal {
    total: u32,
}

#[derive(Debug, Deserialize)]
struct SpCreatedPlaylist {
    id: String,
}

impl SpTrack {
    /// Convert to a catalog track. Tracks without an id are dropped.
    fn into_track(self) -> Option<CatalogTrack> {
        let id = self.id?;
        let artist = self
            .artists
            .iter()
            .map(|a| a.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");

        Some(CatalogTrack {
            id,
            name: self.name,
            artist,
            album: self.album.map(|a| a.name).unwrap_or_default(),
            duration_ms: self.duration_ms,
        })
    }
}

impl From<SpPlaylistTracksPage> for TracksPage {
    fn from(page: SpPlaylistTracksPage) -> Self {
        TracksPage {
            tracks: page
                .items
                .into_iter()
                .filter_map(|item| item.track.and_then(SpTrack::into_track))
                .collect(),
            next_cursor: page.next,
        }
    }
}

impl From<SpPlaylist> for PlaylistMetadata {
    fn from(sp: SpPlaylist) -> Self {
        PlaylistMetadata {
            id: sp.id,
            name: sp.name,
            description: sp.description.filter(|d| !d.is_empty()),
            track_count: sp.tracks.map(|t| t.total),
        }
    }
}
