//! Testing utilities and mock implementations.
//!
//! This module provides mock implementations of the catalog, sink and
//! throttle traits, allowing resolution and sync to be tested without a
//! remote service.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tunebridge_core::testing::{fixtures, MockCatalog, RecordingThrottle};
//!
//! let catalog = Arc::new(MockCatalog::new());
//! let throttle = Arc::new(RecordingThrottle::new());
//!
//! // Configure mock responses
//! catalog.set_search_results("Halo Beyoncé", vec![fixtures::catalog_track("t1", "Halo", "Beyoncé")]).await;
//!
//! // Hand them to a TrackResolver / PlaylistSync...
//! ```

mod mock_catalog;
mod mock_sink;
mod recording_throttle;

pub use mock_catalog::{MockCatalog, RecordedCatalogCall};
pub use mock_sink::MockPlaylistSink;
pub use recording_throttle::RecordingThrottle;

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::matching::{CatalogTrack, TrackQuery};
    use crate::orchestrator::SourcePlaylist;

    /// Create a catalog track with reasonable defaults.
    pub fn catalog_track(id: &str, name: &str, artist: &str) -> CatalogTrack {
        CatalogTrack {
            id: id.to_string(),
            name: name.to_string(),
            artist: artist.to_string(),
            album: String::new(),
            duration_ms: Some(200_000),
        }
    }

    /// Create `count` distinct tracks with ids `<prefix>-<n>`.
    pub fn numbered_tracks(prefix: &str, count: usize) -> Vec<CatalogTrack> {
        (1..=count)
            .map(|i| CatalogTrack {
                id: format!("{}-{}", prefix, i),
                name: format!("Song {}", i),
                artist: format!("Artist {}", i),
                album: format!("Album {}", i),
                duration_ms: Some(180_000 + i as u64 * 1_000),
            })
            .collect()
    }

    /// Create a track query.
    pub fn track_query(name: &str, artist: &str) -> TrackQuery {
        TrackQuery::new(name, artist)
    }

    /// A source playlist mirroring `tracks`.
    pub fn source_playlist(name: &str, tracks: &[CatalogTrack]) -> SourcePlaylist {
        SourcePlaylist::new(name, tracks.iter().map(CatalogTrack::to_query).collect())
    }
}
