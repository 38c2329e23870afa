//! Search strategy controller.
//!
//! Resolves a [`TrackQuery`] against a remote catalog by running ordered
//! search strategies until one yields an accepted match:
//!
//! 1. **Standard**: normalized title and artist as free text.
//! 2. **Artist-anchored**: the artist alone, with a wider limit, keeping
//!    only candidates whose title overlaps the query title.
//!
//! Every strategy drops candidates whose artist neither contains nor is
//! contained in the query artist before anything is scored. Survivors
//! accumulate into one pool (deduplicated by id). When no strategy's
//! selection accepts a candidate, a last pass over the pool takes the
//! best candidate that is by the original artist and has an equivalent
//! title.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::catalog::{CatalogSearch, SearchKind};
use crate::matching::{
    are_equivalent_titles, find_best_match, normalize_artist, normalize_title, CatalogTrack,
    MatchScorer, MatchStrategy, MatchingConfig, ResolvedTrack, ScoredCandidate,
    SelectionThresholds, TrackQuery,
};
use crate::metrics;

/// Errors from track resolution. Not finding a match is not an error.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The query is malformed (blank name or artist).
    #[error("invalid query: {0}")]
    InvalidQuery(String),
}

/// Search limits per strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Results requested by the standard search.
    #[serde(default = "default_standard_limit")]
    pub standard_limit: u32,
    /// Results requested by the artist-anchored search.
    #[serde(default = "default_artist_limit")]
    pub artist_limit: u32,
}

fn default_standard_limit() -> u32 {
    15
}

fn default_artist_limit() -> u32 {
    25
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            standard_limit: default_standard_limit(),
            artist_limit: default_artist_limit(),
        }
    }
}

impl ResolverConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.standard_limit == 0 {
            return Err("standard_limit must be at least 1".to_string());
        }
        if self.artist_limit == 0 {
            return Err("artist_limit must be at least 1".to_string());
        }
        Ok(())
    }
}

/// Resolves tracks against one catalog.
pub struct TrackResolver {
    catalog: Arc<dyn CatalogSearch>,
    scorer: MatchScorer,
    thresholds: SelectionThresholds,
    config: ResolverConfig,
}

impl TrackResolver {
    /// Create a resolver with default weights, thresholds and limits.
    pub fn new(catalog: Arc<dyn CatalogSearch>) -> Self {
        Self::with_config(catalog, &MatchingConfig::default(), ResolverConfig::default())
    }

    /// Create a resolver with explicit configuration.
    pub fn with_config(
        catalog: Arc<dyn CatalogSearch>,
        matching: &MatchingConfig,
        config: ResolverConfig,
    ) -> Self {
        Self {
            catalog,
            scorer: MatchScorer::with_config(matching.weights.clone(), matching.thresholds.clone()),
            thresholds: matching.thresholds.clone(),
            config,
        }
    }

    /// Find the catalog track for `query`.
    ///
    /// Returns `Ok(None)` when no candidate is acceptable. A failing search
    /// only ends its own strategy.
    pub async fn resolve_track(
        &self,
        query: &TrackQuery,
    ) -> Result<Option<ResolvedTrack>, ResolveError> {
        if let Err(e) = query.validate() {
            metrics::RESOLUTIONS.with_label_values(&["invalid"]).inc();
            return Err(ResolveError::InvalidQuery(e));
        }

        let title = normalize_title(&query.name);
        let artist = normalize_artist(&query.artist);

        let mut pool: Vec<ScoredCandidate> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();

        for strategy in [MatchStrategy::Standard, MatchStrategy::ArtistAnchored] {
            let (search, kind, limit) = match strategy {
                MatchStrategy::ArtistAnchored => {
                    (artist.clone(), SearchKind::Artist, self.config.artist_limit)
                }
                _ => (
                    format!("{} {}", title, artist),
                    SearchKind::Track,
                    self.config.standard_limit,
                ),
            };

            let results = match self.catalog.search_catalog(&search, kind, limit).await {
                Ok(results) => results,
                Err(e) if e.is_transient() => {
                    warn!(
                        strategy = ?strategy,
                        query = %search,
                        error = %e,
                        "Catalog search failed, skipping strategy"
                    );
                    continue;
                }
                Err(e) => {
                    error!(
                        strategy = ?strategy,
                        query = %search,
                        error = %e,
                        "Catalog search rejected, skipping strategy"
                    );
                    continue;
                }
            };

            let found = results.len();
            let candidates: Vec<CatalogTrack> = results
                .into_iter()
                .filter(|c| artist_contains(&artist, &c.artist))
                .filter(|c| strategy != MatchStrategy::ArtistAnchored || titles_overlap(&title, &c.name))
                .filter(|c| seen.insert(c.id.clone()))
                .collect();

            debug!(
                strategy = ?strategy,
                found,
                kept = candidates.len(),
                pool = pool.len() + candidates.len(),
                "Scored search results"
            );

            pool.extend(self.scorer.score_all(candidates, query));

            if let Some(best) = find_best_match(&pool, &self.thresholds) {
                return Ok(Some(Self::accept(query, best, strategy)));
            }
        }

        let pooled = pool
            .iter()
            .filter(|c| c.result.details.is_original_artist)
            .filter(|c| c.result.details.is_title_match)
            .fold(None::<&ScoredCandidate>, |best, c| match best {
                Some(b) if b.score() >= c.score() => Some(b),
                _ => Some(c),
            });

        if let Some(best) = pooled {
            return Ok(Some(Self::accept(query, best, MatchStrategy::Pooled)));
        }

        info!(
            name = %query.name,
            artist = %query.artist,
            candidates = pool.len(),
            "No acceptable match"
        );
        metrics::RESOLUTIONS.with_label_values(&["no_match"]).inc();
        Ok(None)
    }

    /// Remote id for `query`, or `None` when it is unresolvable or invalid.
    pub async fn resolve_track_id(&self, query: &TrackQuery) -> Option<String> {
        match self.resolve_track(query).await {
            Ok(resolved) => resolved.map(|r| r.remote_id),
            Err(e) => {
                debug!(error = %e, "Skipping invalid query");
                None
            }
        }
    }

    fn accept(query: &TrackQuery, best: &ScoredCandidate, strategy: MatchStrategy) -> ResolvedTrack {
        debug!(
            name = %query.name,
            artist = %query.artist,
            remote_id = %best.result.remote_id,
            score = best.score(),
            strategy = ?strategy,
            "Resolved track"
        );

        metrics::RESOLUTIONS.with_label_values(&["matched"]).inc();
        metrics::RESOLUTION_STRATEGY
            .with_label_values(&[strategy_label(strategy)])
            .inc();
        metrics::MATCH_SCORE
            .with_label_values(&[])
            .observe(best.score());

        ResolvedTrack {
            remote_id: best.result.remote_id.clone(),
            score: best.score(),
            details: best.result.details.clone(),
            strategy,
        }
    }
}

fn strategy_label(strategy: MatchStrategy) -> &'static str {
    match strategy {
        MatchStrategy::Standard => "standard",
        MatchStrategy::ArtistAnchored => "artist_anchored",
        MatchStrategy::Pooled => "pooled",
    }
}

/// Case-folded containment in either direction. An empty credit never
/// passes.
fn artist_contains(query_artist: &str, candidate_artist: &str) -> bool {
    let query = query_artist.to_lowercase();
    let candidate = normalize_artist(candidate_artist).to_lowercase();
    if query.is_empty() || candidate.is_empty() {
        return false;
    }
    candidate.contains(&query) || query.contains(&candidate)
}

/// Normalized titles overlap: containment in either direction, or
/// equivalent titles.
fn titles_overlap(query_title: &str, candidate_name: &str) -> bool {
    let query = query_title.to_lowercase();
    let candidate = normalize_title(candidate_name).to_lowercase();
    if query.is_empty() || candidate.is_empty() {
        return false;
    }
    candidate.contains(&query)
        || query.contains(&candidate)
        || are_equivalent_titles(query_title, candidate_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogError;
    use crate::testing::{fixtures, MockCatalog, RecordedCatalogCall};

    fn resolver(catalog: &Arc<MockCatalog>) -> TrackResolver {
        TrackResolver::new(catalog.clone())
    }

    #[tokio::test]
    async fn test_accented_title_resolves() {
        let catalog = Arc::new(MockCatalog::new());
        catalog
            .set_search_results(
                "Déjà Vu Beyoncé",
                vec![fixtures::catalog_track("dv", "Déjà Vu", "Beyoncé")],
            )
            .await;

        let query = TrackQuery::new("Déjà Vu (feat. Jay-Z)", "Beyoncé");
        let resolved = resolver(&catalog).resolve_track(&query).await.unwrap().unwrap();

        assert_eq!(resolved.remote_id, "dv");
        assert_eq!(resolved.strategy, MatchStrategy::Standard);
    }

    #[tokio::test]
    async fn test_cjk_title_resolves_by_artist() {
        let catalog = Arc::new(MockCatalog::new());
        catalog
            .set_search_results(
                "椎名林檎",
                vec![
                    fixtures::catalog_track("a", "丸の内サディスティック", "椎名林檎"),
                    fixtures::catalog_track("b", "東京", "椎名林檎"),
                ],
            )
            .await;

        let query = TrackQuery::new("東京 - Live", "椎名林檎");
        let resolved = resolver(&catalog).resolve_track(&query).await.unwrap().unwrap();

        assert_eq!(resolved.remote_id, "b");
        assert_eq!(resolved.strategy, MatchStrategy::ArtistAnchored);
        assert!(resolved.details.is_title_match);
    }

    #[tokio::test]
    async fn test_standard_strategy_exact_match() {
        let catalog = Arc::new(MockCatalog::new());
        catalog
            .set_search_results(
                "Red Nosed Artist A",
                vec![
                    fixtures::catalog_track("t1", "Rednosed", "Artist A"),
                    fixtures::catalog_track("t2", "Rednosed (Karaoke)", "Artist A Tribute"),
                ],
            )
            .await;

        let query = TrackQuery::new("Red Nosed (feat. X)", "Artist A");
        let resolved = resolver(&catalog).resolve_track(&query).await.unwrap().unwrap();

        assert_eq!(resolved.remote_id, "t1");
        assert_eq!(resolved.strategy, MatchStrategy::Standard);
        assert!(resolved.details.is_title_match);
        assert!(resolved.details.is_original_artist);
        assert_eq!(catalog.recorded_calls().await.len(), 1);
    }

    #[tokio::test]
    async fn test_artist_gate_rejects_before_scoring() {
        let catalog = Arc::new(MockCatalog::new());
        catalog
            .set_search_results(
                "Halo Beyoncé",
                vec![fixtures::catalog_track("t1", "Halo", "Someone Else")],
            )
            .await;

        let query = TrackQuery::new("Halo", "Beyoncé");
        let resolved = resolver(&catalog).resolve_track(&query).await.unwrap();
        assert!(resolved.is_none());

        // both strategies ran
        let calls = catalog.recorded_calls().await;
        assert_eq!(calls.len(), 2);
        assert!(matches!(
            &calls[1],
            RecordedCatalogCall::Search { kind: SearchKind::Artist, limit: 25, .. }
        ));
    }

    #[tokio::test]
    async fn test_artist_anchored_fallback() {
        let catalog = Arc::new(MockCatalog::new());
        catalog
            .set_search_results(
                "Beyoncé",
                vec![
                    fixtures::catalog_track("t1", "Single Ladies", "Beyoncé"),
                    fixtures::catalog_track("t2", "Halo", "Beyoncé"),
                ],
            )
            .await;

        let query = TrackQuery::new("Halo", "Beyoncé");
        let resolved = resolver(&catalog).resolve_track(&query).await.unwrap().unwrap();

        assert_eq!(resolved.remote_id, "t2");
        assert_eq!(resolved.strategy, MatchStrategy::ArtistAnchored);
    }

    #[tokio::test]
    async fn test_failed_search_only_ends_its_strategy() {
        let catalog = Arc::new(MockCatalog::new());
        catalog.set_next_error(CatalogError::RateLimitExceeded).await;
        catalog
            .set_search_results("Beyoncé", vec![fixtures::catalog_track("t2", "Halo", "Beyoncé")])
            .await;

        let query = TrackQuery::new("Halo", "Beyoncé");
        let resolved = resolver(&catalog).resolve_track(&query).await.unwrap().unwrap();

        assert_eq!(resolved.remote_id, "t2");
        assert_eq!(resolved.strategy, MatchStrategy::ArtistAnchored);
    }

    #[tokio::test]
    async fn test_rejected_search_only_ends_its_strategy() {
        let catalog = Arc::new(MockCatalog::new());
        catalog
            .set_next_error(CatalogError::ApiError {
                status: 400,
                message: "bad query".to_string(),
            })
            .await;
        catalog
            .set_search_results("Beyoncé", vec![fixtures::catalog_track("t2", "Halo", "Beyoncé")])
            .await;

        let query = TrackQuery::new("Halo", "Beyoncé");
        let resolved = resolver(&catalog).resolve_track(&query).await.unwrap().unwrap();
        assert_eq!(resolved.strategy, MatchStrategy::ArtistAnchored);
    }

    #[tokio::test]
    async fn test_no_match_is_none() {
        let catalog = Arc::new(MockCatalog::new());
        let query = TrackQuery::new("Unknown Song", "Nobody");
        assert!(resolver(&catalog).resolve_track(&query).await.unwrap().is_none());
        assert!(resolver(&catalog).resolve_track_id(&query).await.is_none());
    }

    #[tokio::test]
    async fn test_invalid_query() {
        let catalog = Arc::new(MockCatalog::new());
        let query = TrackQuery::new("  ", "Artist");

        let result = resolver(&catalog).resolve_track(&query).await;
        assert!(matches!(result, Err(ResolveError::InvalidQuery(_))));
        assert!(catalog.recorded_calls().await.is_empty());
    }

    #[test]
    fn test_artist_contains() {
        assert!(artist_contains("Queen", "Queen & David Bowie"));
        assert!(artist_contains("Florence + The Machine", "florence"));
        assert!(!artist_contains("Beyoncé", "Beyonce"));
        assert!(!artist_contains("Adele", ""));
    }

    #[test]
    fn test_titles_overlap() {
        assert!(titles_overlap("Halo", "Halo - Live"));
        assert!(titles_overlap("Yellow Submarine", "Yellow"));
        assert!(titles_overlap("Dont Stop Me Now", "Don't Stop Me Now"));
        assert!(!titles_overlap("Halo", "Single Ladies"));
    }

    #[test]
    fn test_config_validation() {
        assert!(ResolverConfig::default().validate().is_ok());
        let config = ResolverConfig {
            artist_limit: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
