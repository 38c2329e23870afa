//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Track resolution (outcomes, winning strategy, match scores)
//! - Remote catalog requests
//! - Batch orchestration (items, pages)
//! - Library loading and playlist sync

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Resolution Metrics
// =============================================================================

/// Track resolutions total by result.
pub static RESOLUTIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("tunebridge_resolutions_total", "Total track resolutions"),
        &["result"], // "matched", "no_match", "invalid"
    )
    .unwrap()
});

/// Successful resolutions by the strategy that produced them.
pub static RESOLUTION_STRATEGY: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "tunebridge_resolution_strategy_total",
            "Successful resolutions by search strategy",
        ),
        &["strategy"], // "standard", "artist_anchored", "pooled"
    )
    .unwrap()
});

/// Score of the accepted candidate.
pub static MATCH_SCORE: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "tunebridge_match_score",
            "Distribution of accepted match scores",
        )
        .buckets(vec![0.6, 0.7, 0.8, 0.9, 1.0, 1.2, 1.4, 1.6, 1.8]),
        &[],
    )
    .unwrap()
});

// =============================================================================
// Catalog Metrics
// =============================================================================

/// Remote catalog requests by operation and result.
pub static CATALOG_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "tunebridge_catalog_requests_total",
            "Total remote catalog requests",
        ),
        &["operation", "result"], // result: "success", "not_found", "error"
    )
    .unwrap()
});

// =============================================================================
// Orchestrator Metrics
// =============================================================================

/// Batch items processed by result.
pub static BATCH_ITEMS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("tunebridge_batch_items_total", "Total batch items processed"),
        &["result"], // "succeeded", "failed"
    )
    .unwrap()
});

/// Pages fetched by the paginator.
pub static PAGES_FETCHED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("tunebridge_pages_fetched_total", "Total pages fetched").unwrap()
});

/// Playlists handled by library loading, by resulting status.
pub static PLAYLISTS_LOADED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "tunebridge_playlists_loaded_total",
            "Total playlists handled by library loading",
        ),
        &["status"], // "loaded", "not_found", "errored", "cached"
    )
    .unwrap()
});

/// Failed writes to the persistence sink.
pub static SINK_FAILURES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "tunebridge_sink_failures_total",
        "Total failed writes to the persistence sink",
    )
    .unwrap()
});

/// Playlist sync duration in seconds.
pub static SYNC_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "tunebridge_sync_duration_seconds",
            "Duration of playlist syncs",
        )
        .buckets(vec![1.0, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0, 600.0]),
        &["result"], // "completed", "failed"
    )
    .unwrap()
});

/// Returns all metrics for registration.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Resolution
        Box::new(RESOLUTIONS.clone()),
        Box::new(RESOLUTION_STRATEGY.clone()),
        Box::new(MATCH_SCORE.clone()),
        // Catalog
        Box::new(CATALOG_REQUESTS.clone()),
        // Orchestrator
        Box::new(BATCH_ITEMS.clone()),
        Box::new(PAGES_FETCHED.clone()),
        Box::new(PLAYLISTS_LOADED.clone()),
        Box::new(SINK_FAILURES.clone()),
        Box::new(SYNC_DURATION.clone()),
    ]
}
