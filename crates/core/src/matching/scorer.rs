//! Weighted multi-factor scoring of a candidate against a query.

use super::config::{MatchWeights, SelectionThresholds};
use super::normalize::{clean_text, normalize_artist, normalize_title, strip_accents};
use super::similarity::{
    are_equivalent_titles, duration_score, is_album_match, similarity,
};
use super::types::{CatalogTrack, MatchDetails, MatchResult, ScoredCandidate, TrackQuery};

/// Words marking a recording that is not the original.
pub const COVER_KEYWORDS: &[&str] = &[
    "karaoke",
    "originally performed",
    "made popular",
    "tribute",
    "as made famous",
    "in the style of",
    "instrumental version",
    "cover",
    "remix",
    "version",
];

/// Album score when the query has no album to compare.
const NEUTRAL_ALBUM_SCORE: f64 = 0.5;

/// Whether the candidate looks like a cover, karaoke, tribute or remix.
///
/// Keywords are matched as whole words in the candidate's title and artist.
pub fn is_cover_version(candidate: &CatalogTrack) -> bool {
    let haystack = format!(" {} ", clean_text(&format!("{} {}", candidate.name, candidate.artist)));

    COVER_KEYWORDS
        .iter()
        .any(|keyword| haystack.contains(&format!(" {} ", keyword)))
}

/// Scores candidates with configurable weights.
#[derive(Debug, Clone, Default)]
pub struct MatchScorer {
    weights: MatchWeights,
    thresholds: SelectionThresholds,
}

impl MatchScorer {
    /// Create a scorer with default weights.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a scorer with custom weights and thresholds.
    pub fn with_config(weights: MatchWeights, thresholds: SelectionThresholds) -> Self {
        Self {
            weights,
            thresholds,
        }
    }

    /// The weights in use.
    pub fn weights(&self) -> &MatchWeights {
        &self.weights
    }

    /// Determine whether `candidate_artist` is the query's artist, and how
    /// strongly the two credits agree.
    ///
    /// Returns `(is_original_artist, artist_score)`.
    pub fn artist_match(&self, query_artist: &str, candidate_artist: &str) -> (bool, f64) {
        let query = normalize_artist(query_artist).to_lowercase();
        let candidate = normalize_artist(candidate_artist).to_lowercase();
        if query.is_empty() || candidate.is_empty() {
            return (false, 0.0);
        }

        let query_plain = strip_accents(&query);
        let candidate_plain = strip_accents(&candidate);
        if candidate.contains(&query)
            || query.contains(&candidate)
            || candidate_plain.contains(&query_plain)
            || query_plain.contains(&candidate_plain)
        {
            return (true, 1.0);
        }

        let score = similarity(&query, &candidate);

        let query_first = query.split_whitespace().next();
        let candidate_first = candidate.split_whitespace().next();
        if let (Some(q), Some(c)) = (query_first, candidate_first) {
            if q.chars().count() > 1 && q == c {
                return (true, score);
            }
        }

        (score >= self.thresholds.artist_similarity, score)
    }

    /// Score one candidate against the query.
    pub fn score(&self, candidate: &CatalogTrack, query: &TrackQuery) -> MatchResult {
        let w = &self.weights;

        let is_cover = is_cover_version(candidate);
        let (is_original_artist, artist_score) = self.artist_match(&query.artist, &candidate.artist);

        let normalized_name = normalize_title(&candidate.name);
        let is_title_match = are_equivalent_titles(&query.name, &candidate.name);
        let name_score = if is_title_match {
            1.0
        } else {
            similarity(&normalize_title(&query.name), &normalized_name)
        };

        let (album_match, album_score) =
            match query.album.as_deref().filter(|a| !a.trim().is_empty()) {
                Some(album) if is_album_match(album, &candidate.album) => (true, 1.0),
                Some(album) => (false, similarity(album, &candidate.album)),
                None => (false, NEUTRAL_ALBUM_SCORE),
            };

        let duration = duration_score(query.duration_ms, candidate.duration_ms);

        let title_multiplier = if is_title_match {
            w.exact_title_bonus
        } else {
            1.0
        };
        let artist_multiplier = if is_original_artist {
            w.artist_match_multiplier
        } else {
            1.0
        };
        let cover_multiplier = if is_cover { w.cover_penalty } else { 1.0 };

        let mut score = (name_score * title_multiplier * w.name
            + artist_score * artist_multiplier * w.artist
            + duration * w.duration
            + album_score * w.album)
            * cover_multiplier;

        if is_title_match && is_original_artist {
            score *= w.original_artist_bonus;
        }

        MatchResult {
            score,
            remote_id: candidate.id.clone(),
            details: MatchDetails {
                is_original_artist,
                is_cover,
                is_title_match,
                album_match,
                normalized_name,
            },
        }
    }

    /// Score every candidate, keeping input order.
    pub fn score_all(&self, candidates: Vec<CatalogTrack>, query: &TrackQuery) -> Vec<ScoredCandidate> {
        candidates
            .into_iter()
            .map(|candidate| {
                let result = self.score(&candidate, query);
                ScoredCandidate { candidate, result }
            })
            .collect()
    }
}
