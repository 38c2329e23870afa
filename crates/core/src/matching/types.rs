//! Shared types for track matching.

use serde::{Deserialize, Serialize};

/// A track being looked up in the destination catalog.
///
/// Built from the source catalog's metadata; the only identity we have is
/// free text plus an optional duration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackQuery {
    /// Track title as reported by the source catalog.
    pub name: String,
    /// Primary artist credit.
    pub artist: String,
    /// Album title, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
    /// Duration in milliseconds, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

impl TrackQuery {
    /// Create a query from name and artist only.
    pub fn new(name: impl Into<String>, artist: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            artist: artist.into(),
            album: None,
            duration_ms: None,
        }
    }

    /// Set the album.
    pub fn with_album(mut self, album: impl Into<String>) -> Self {
        self.album = Some(album.into());
        self
    }

    /// Set the duration in milliseconds.
    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    /// Check that the query carries enough text to be matched.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("track name is empty".to_string());
        }
        if self.artist.trim().is_empty() {
            return Err(format!("artist is empty for track '{}'", self.name));
        }
        Ok(())
    }
}

/// A track returned by a catalog search or playlist listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogTrack {
    /// Catalog-specific track identifier.
    pub id: String,
    /// Track title.
    pub name: String,
    /// Artist credit (multiple artists joined with ", ").
    pub artist: String,
    /// Album title.
    #[serde(default)]
    pub album: String,
    /// Duration in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

impl CatalogTrack {
    /// Convert into a query against another catalog.
    pub fn to_query(&self) -> TrackQuery {
        TrackQuery {
            name: self.name.clone(),
            artist: self.artist.clone(),
            album: if self.album.is_empty() {
                None
            } else {
                Some(self.album.clone())
            },
            duration_ms: self.duration_ms,
        }
    }
}

/// Flags explaining how a candidate was scored.
///
/// The selector decides on these, not only on the numeric score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchDetails {
    /// Candidate artist is the query's artist.
    pub is_original_artist: bool,
    /// Candidate looks like a cover, karaoke, tribute or remix.
    pub is_cover: bool,
    /// Candidate title is equivalent to the query title.
    pub is_title_match: bool,
    /// Candidate album matches the query album.
    pub album_match: bool,
    /// Normalized candidate title.
    pub normalized_name: String,
}

/// Score of one candidate against one query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    /// Weighted score. Not capped at 1.0: bonuses can push it above.
    pub score: f64,
    /// Identifier of the scored candidate.
    pub remote_id: String,
    /// Decision flags.
    pub details: MatchDetails,
}

/// A candidate together with its score.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate {
    pub candidate: CatalogTrack,
    pub result: MatchResult,
}

impl ScoredCandidate {
    /// Shortcut for the candidate's score.
    pub fn score(&self) -> f64 {
        self.result.score
    }
}

/// Which search strategy produced an accepted match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    /// Title and artist query.
    Standard,
    /// Artist-only query with a title post-filter.
    ArtistAnchored,
    /// Cross-strategy pass over the whole candidate pool.
    Pooled,
}

/// Successful resolution of a query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedTrack {
    /// Identifier in the destination catalog.
    pub remote_id: String,
    /// Score of the accepted candidate.
    pub score: f64,
    /// Flags of the accepted candidate.
    pub details: MatchDetails,
    /// Strategy that produced the match.
    pub strategy: MatchStrategy,
}
