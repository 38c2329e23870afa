//! Track identity matching.
//!
//! Two catalogs share no identifiers, so a track is identified by its text
//! fingerprint (title, artist) plus album and duration hints.
//!
//! ```text
//!   TrackQuery ──► normalize ──► similarity ──► MatchScorer ──► find_best_match
//!                  (titles,      (tokens,       (weights,       (exact match first,
//!                   artists)      durations,     flags)          then thresholds)
//!                                 albums)
//! ```
//!
//! Everything here is pure and synchronous; the async search loop lives in
//! [`crate::resolver`].

mod config;
pub mod normalize;
mod scorer;
mod selector;
pub mod similarity;
mod types;

pub use config::{MatchWeights, MatchingConfig, SelectionThresholds};
pub use normalize::{clean_text, normalize_artist, normalize_title};
pub use scorer::{is_cover_version, MatchScorer, COVER_KEYWORDS};
pub use selector::{find_best_match, is_acceptable, is_exact_match};
pub use similarity::{
    are_equivalent_titles, duration_score, is_album_match, levenshtein, similarity,
};
pub use types::{
    CatalogTrack, MatchDetails, MatchResult, MatchStrategy, ResolvedTrack, ScoredCandidate,
    TrackQuery,
};
