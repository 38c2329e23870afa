//! Remote music catalog interfaces.
//!
//! The resolver and the sync orchestrator only talk to a catalog through
//! these traits. [`SpotifyClient`] implements them over HTTP; tests use
//! the mocks in [`crate::testing`].

mod spotify;
mod types;

pub use spotify::{SpotifyClient, SpotifyConfig};
pub use types::*;

use async_trait::async_trait;
use thiserror::Error;

use crate::cache::ResolutionCacheEntry;
use crate::matching::CatalogTrack;

/// Errors that can occur when talking to a remote catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Rate limit exceeded.
    #[error("Rate limit exceeded, please wait before retrying")]
    RateLimitExceeded,

    /// Resource not found (404).
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// API returned an error.
    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    /// Failed to parse response.
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Client not configured (missing access token, etc.).
    #[error("Client not configured: {0}")]
    NotConfigured(String),
}

impl CatalogError {
    /// The remote entity does not exist. Never worth retrying.
    pub fn is_not_found(&self) -> bool {
        matches!(self, CatalogError::NotFound(_))
    }

    /// Network trouble, throttling or a server-side failure.
    pub fn is_transient(&self) -> bool {
        match self {
            CatalogError::HttpError(_) | CatalogError::RateLimitExceeded => true,
            CatalogError::ApiError { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Errors from a persistence sink.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Track search against a remote catalog.
#[async_trait]
pub trait CatalogSearch: Send + Sync {
    /// Search tracks. At most `limit` results, in catalog relevance order.
    async fn search_catalog(
        &self,
        query: &str,
        kind: SearchKind,
        limit: u32,
    ) -> Result<Vec<CatalogTrack>, CatalogError>;
}

/// Read access to remote playlists.
#[async_trait]
pub trait PlaylistSource: Send + Sync {
    /// Fetch one page of a playlist's tracks.
    ///
    /// `cursor` is `None` for the first page, then whatever the previous
    /// page returned as `next_cursor`.
    async fn fetch_tracks_page(
        &self,
        playlist_id: &str,
        cursor: Option<&str>,
    ) -> Result<TracksPage, CatalogError>;

    /// Fetch playlist metadata. Fails with [`CatalogError::NotFound`] when
    /// the playlist does not exist.
    async fn fetch_playlist_metadata(
        &self,
        playlist_id: &str,
    ) -> Result<PlaylistMetadata, CatalogError>;
}

/// Write access to remote playlists.
#[async_trait]
pub trait PlaylistWriter: Send + Sync {
    /// Create an empty playlist and return its id.
    async fn create_playlist(
        &self,
        name: &str,
        description: Option<&str>,
    ) -> Result<String, CatalogError>;

    /// Append tracks to a playlist.
    async fn add_tracks_to_playlist(
        &self,
        playlist_id: &str,
        track_ids: &[String],
    ) -> Result<(), CatalogError>;
}

/// Best-effort persistence of resolved playlists.
pub trait PlaylistSink: Send + Sync {
    /// Persist a resolved playlist, replacing any previous copy.
    fn persist_resolved_playlist(&self, entry: &ResolutionCacheEntry) -> Result<(), SinkError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        assert!(CatalogError::NotFound("pl".into()).is_not_found());
        assert!(!CatalogError::NotFound("pl".into()).is_transient());
        assert!(CatalogError::RateLimitExceeded.is_transient());
        assert!(CatalogError::ApiError {
            status: 503,
            message: String::new()
        }
        .is_transient());
        assert!(!CatalogError::ApiError {
            status: 400,
            message: String::new()
        }
        .is_transient());
        assert!(!CatalogError::NotConfigured("token".into()).is_transient());
    }
}
