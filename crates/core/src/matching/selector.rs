//! Deterministic choice of the best candidate, or none.

use super::config::SelectionThresholds;
use super::types::ScoredCandidate;

/// An unambiguous identity match: same title, original artist, not a cover.
pub fn is_exact_match(candidate: &ScoredCandidate) -> bool {
    let d = &candidate.result.details;
    d.is_title_match && d.is_original_artist && !d.is_cover
}

/// Whether a candidate's score is backed strongly enough by its flags.
pub fn is_acceptable(candidate: &ScoredCandidate, thresholds: &SelectionThresholds) -> bool {
    let score = candidate.score();
    let d = &candidate.result.details;

    if score < thresholds.min_score {
        return false;
    }

    (d.is_original_artist && score >= thresholds.original_artist_score)
        || (d.is_title_match && score >= thresholds.title_match_score)
        || (d.album_match && score >= thresholds.album_match_score)
        || score >= thresholds.standalone_score
}

/// Pick the best candidate, or `None` when nothing is good enough.
///
/// The first exact match in input order wins outright, whatever the scores
/// say. Otherwise the highest score is taken (ties keep input order) and is
/// only returned if [`is_acceptable`] holds.
pub fn find_best_match<'a>(
    candidates: &'a [ScoredCandidate],
    thresholds: &SelectionThresholds,
) -> Option<&'a ScoredCandidate> {
    if let Some(exact) = candidates.iter().find(|c| is_exact_match(c)) {
        return Some(exact);
    }

    let mut ranked: Vec<&ScoredCandidate> = candidates.iter().collect();
    // sort_by is stable: equal scores keep their input order
    ranked.sort_by(|a, b| {
        b.score()
            .partial_cmp(&a.score())
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    ranked
        .into_iter()
        .next()
        .filter(|best| is_acceptable(best, thresholds))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::types::{CatalogTrack, MatchDetails, MatchResult};

    fn scored(id: &str, score: f64, artist: bool, title: bool, cover: bool) -> ScoredCandidate {
        ScoredCandidate {
            candidate: CatalogTrack {
                id: id.to_string(),
                name: id.to_string(),
                artist: "artist".to_string(),
                album: String::new(),
                duration_ms: None,
            },
            result: MatchResult {
                score,
                remote_id: id.to_string(),
                details: MatchDetails {
                    is_original_artist: artist,
                    is_cover: cover,
                    is_title_match: title,
                    album_match: false,
                    normalized_name: id.to_string(),
                },
            },
        }
    }

    #[test]
    fn test_exact_match_beats_higher_score() {
        let candidates = vec![
            scored("wrong-artist", 0.99, false, true, false),
            scored("exact", 0.65, true, true, false),
        ];
        let best = find_best_match(&candidates, &SelectionThresholds::default()).unwrap();
        assert_eq!(best.result.remote_id, "exact");
    }

    #[test]
    fn test_cover_is_never_exact() {
        let candidates = vec![scored("cover", 0.5, true, true, true)];
        assert!(find_best_match(&candidates, &SelectionThresholds::default()).is_none());
    }

    #[test]
    fn test_threshold_rules() {
        let t = SelectionThresholds::default();
        // below the floor
        assert!(!is_acceptable(&scored("a", 0.59, true, false, false), &t));
        // artist match needs 0.75
        assert!(!is_acceptable(&scored("b", 0.74, true, false, false), &t));
        assert!(is_acceptable(&scored("c", 0.75, true, false, false), &t));
        // title match needs 0.7
        assert!(is_acceptable(&scored("d", 0.7, false, true, true), &t));
        // no flags needs 0.9
        assert!(!is_acceptable(&scored("e", 0.89, false, false, false), &t));
        assert!(is_acceptable(&scored("f", 0.9, false, false, false), &t));
    }

    #[test]
    fn test_ties_keep_input_order() {
        let candidates = vec![
            scored("first", 0.95, false, false, false),
            scored("second", 0.95, false, false, false),
        ];
        let best = find_best_match(&candidates, &SelectionThresholds::default()).unwrap();
        assert_eq!(best.result.remote_id, "first");
    }

    #[test]
    fn test_deterministic() {
        let candidates = vec![
            scored("a", 0.8, true, false, false),
            scored("b", 0.91, false, false, false),
            scored("c", 0.8, true, false, false),
        ];
        let t = SelectionThresholds::default();
        let first = find_best_match(&candidates, &t).map(|c| c.result.remote_id.clone());
        for _ in 0..10 {
            let again = find_best_match(&candidates, &t).map(|c| c.result.remote_id.clone());
            assert_eq!(first, again);
        }
        assert_eq!(first.as_deref(), Some("b"));
    }

    #[test]
    fn test_empty_candidates() {
        assert!(find_best_match(&[], &SelectionThresholds::default()).is_none());
    }
}
