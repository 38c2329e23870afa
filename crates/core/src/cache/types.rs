//! Types for the resolution cache.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::matching::CatalogTrack;

/// Status of a cached playlist resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ResolutionStatus {
    /// Tracks were fetched.
    Loaded,
    /// The playlist does not exist remotely.
    NotFound,
    /// Loading failed with an unexpected error.
    Errored { message: String },
}

impl ResolutionStatus {
    /// Short label used in logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionStatus::Loaded => "loaded",
            ResolutionStatus::NotFound => "not_found",
            ResolutionStatus::Errored { .. } => "errored",
        }
    }

    /// Whether this entry is a negative-cache marker.
    pub fn is_negative(&self) -> bool {
        !matches!(self, ResolutionStatus::Loaded)
    }
}

/// A track inside a resolved playlist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackRecord {
    pub id: String,
    pub name: String,
    pub artist: String,
    #[serde(default)]
    pub album: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

impl From<CatalogTrack> for TrackRecord {
    fn from(track: CatalogTrack) -> Self {
        Self {
            id: track.id,
            name: track.name,
            artist: track.artist,
            album: track.album,
            duration_ms: track.duration_ms,
        }
    }
}

/// Cached outcome of resolving one remote playlist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionCacheEntry {
    pub remote_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Tracks by id. Duplicate ids collapse to one record.
    #[serde(default)]
    pub tracks: BTreeMap<String, TrackRecord>,
    /// Number of playlist items, duplicates included.
    pub track_count: usize,
    pub total_duration_ms: u64,
    pub status: ResolutionStatus,
    pub resolved_at: DateTime<Utc>,
}

impl ResolutionCacheEntry {
    /// A loaded entry built from the fetched tracks.
    pub fn loaded(remote_id: impl Into<String>, name: Option<String>, tracks: Vec<CatalogTrack>) -> Self {
        let track_count = tracks.len();
        let total_duration_ms = tracks.iter().filter_map(|t| t.duration_ms).sum();
        let tracks = tracks
            .into_iter()
            .map(|t| (t.id.clone(), TrackRecord::from(t)))
            .collect();

        Self {
            remote_id: remote_id.into(),
            name,
            tracks,
            track_count,
            total_duration_ms,
            status: ResolutionStatus::Loaded,
            resolved_at: Utc::now(),
        }
    }

    /// A permanent marker for a playlist that does not exist.
    pub fn not_found(remote_id: impl Into<String>) -> Self {
        Self::negative(remote_id, ResolutionStatus::NotFound)
    }

    /// A marker for a playlist whose load failed.
    pub fn errored(remote_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::negative(
            remote_id,
            ResolutionStatus::Errored {
                message: message.into(),
            },
        )
    }

    fn negative(remote_id: impl Into<String>, status: ResolutionStatus) -> Self {
        Self {
            remote_id: remote_id.into(),
            name: None,
            tracks: BTreeMap::new(),
            track_count: 0,
            total_duration_ms: 0,
            status,
            resolved_at: Utc::now(),
        }
    }
}

/// Progress of a library load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadingProgress {
    pub total: usize,
    pub loaded: usize,
    pub is_complete: bool,
}

impl LoadingProgress {
    /// Fresh progress for `total` items. An empty load is complete at once.
    pub fn new(total: usize) -> Self {
        Self {
            total,
            loaded: 0,
            is_complete: total == 0,
        }
    }

    /// Count one more item, never past `total`.
    pub fn advance(&mut self) {
        self.loaded = (self.loaded + 1).min(self.total);
        self.is_complete = self.loaded >= self.total;
    }
}

/// Result of a background library load request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Another load was running; nothing was done.
    AlreadyLoading,
    /// The load ran to completion.
    Completed(LoadSummary),
}

/// Per-status counts of one library load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadSummary {
    /// Served from the cache without a remote call.
    pub cached: usize,
    pub loaded: usize,
    pub not_found: usize,
    pub errored: usize,
}
