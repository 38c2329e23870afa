pub mod cache;
pub mod catalog;
pub mod config;
pub mod matching;
pub mod metrics;
pub mod orchestrator;
pub mod resolver;
pub mod testing;

pub use cache::{
    LibraryLoader, LoadOutcome, LoadSummary, LoadingProgress, ResolutionCache,
    ResolutionCacheEntry, ResolutionStatus, SqlitePlaylistSink,
};
pub use catalog::{
    CatalogError, CatalogSearch, PlaylistSink, PlaylistSource, PlaylistWriter, SinkError,
    SpotifyClient, SpotifyConfig,
};
pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, SanitizedConfig,
};
pub use matching::{CatalogTrack, MatchResult, MatchScorer, MatchingConfig, ResolvedTrack, TrackQuery};
pub use orchestrator::{
    BatchConfig, BatchRunner, LibraryConfig, PlaylistSync, SourcePlaylist, SyncConfig, SyncError,
    SyncReport, Throttle, TokioThrottle,
};
pub use resolver::{ResolveError, ResolverConfig, TrackResolver};
