//! Types for playlist sync.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::CatalogError;
use crate::matching::TrackQuery;

/// Errors that abort a sync before any report can be produced.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The source playlist is unusable.
    #[error("invalid source playlist: {0}")]
    InvalidPlaylist(String),

    /// Source playlist metadata could not be fetched.
    #[error("failed to fetch source playlist {playlist_id}: {source}")]
    SourceMetadata {
        playlist_id: String,
        #[source]
        source: CatalogError,
    },

    /// The destination playlist could not be created.
    #[error("failed to create destination playlist: {0}")]
    CreatePlaylist(#[source] CatalogError),
}

/// A playlist to copy into the destination catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourcePlaylist {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub tracks: Vec<TrackQuery>,
}

impl SourcePlaylist {
    pub fn new(name: impl Into<String>, tracks: Vec<TrackQuery>) -> Self {
        Self {
            name: name.into(),
            description: None,
            tracks,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Result of a playlist sync. Always produced once the destination exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncReport {
    /// Id of the created destination playlist.
    pub destination_id: String,
    pub tracks_added: usize,
    pub total_tracks: usize,
    pub failed_count: usize,
    /// Source tracks that were not resolved or could not be added.
    pub failed_songs: Vec<TrackQuery>,
}

impl SyncReport {
    /// Whether every source track made it into the destination.
    pub fn is_complete(&self) -> bool {
        self.failed_count == 0 && self.tracks_added == self.total_tracks
    }
}
