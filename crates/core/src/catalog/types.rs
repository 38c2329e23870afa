//! Types exchanged with remote catalogs.

use serde::{Deserialize, Serialize};

use crate::matching::CatalogTrack;

/// How a search query should be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchKind {
    /// Free text matched against title, artist and album.
    Track,
    /// The query is an artist name; returns that artist's tracks.
    Artist,
}

/// One page of a playlist's tracks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TracksPage {
    pub tracks: Vec<CatalogTrack>,
    /// Opaque token for the next page. `None` on the last page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

/// Playlist metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaylistMetadata {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Track count as reported by the catalog.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub track_count: Option<u32>,
}
