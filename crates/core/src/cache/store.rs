//! In-memory resolution cache and the background library loader.

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::types::{
    LoadOutcome, LoadSummary, LoadingProgress, ResolutionCacheEntry, ResolutionStatus,
};
use crate::catalog::{PlaylistSink, PlaylistSource};
use crate::metrics;
use crate::orchestrator::{
    fetch_all_pages, BatchOutcome, BatchRunner, LibraryConfig, Page, Throttle,
};

const IDLE: u8 = 0;
const LOADING: u8 = 1;

/// Resolved playlists of one library-sync session.
///
/// Entries are written once. Negative entries (`NotFound`, `Errored`) are
/// never refreshed automatically; [`ResolutionCache::invalidate`] is the
/// only way to force a retry.
#[derive(Debug)]
pub struct ResolutionCache {
    entries: RwLock<HashMap<String, ResolutionCacheEntry>>,
    progress: RwLock<LoadingProgress>,
    state: AtomicU8,
}

impl Default for ResolutionCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ResolutionCache {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            progress: RwLock::new(LoadingProgress::default()),
            state: AtomicU8::new(IDLE),
        }
    }

    /// Reset progress for a fresh load of `total` items.
    pub async fn begin_library_load(&self, total: usize) {
        *self.progress.write().await = LoadingProgress::new(total);
    }

    /// Current load progress.
    pub async fn progress(&self) -> LoadingProgress {
        *self.progress.read().await
    }

    /// Count one item of the current load.
    pub async fn advance(&self) {
        self.progress.write().await.advance();
    }

    pub async fn get(&self, remote_id: &str) -> Option<ResolutionCacheEntry> {
        self.entries.read().await.get(remote_id).cloned()
    }

    pub async fn contains(&self, remote_id: &str) -> bool {
        self.entries.read().await.contains_key(remote_id)
    }

    /// Store an entry unless one already exists. Returns whether it was stored.
    pub async fn insert(&self, entry: ResolutionCacheEntry) -> bool {
        let mut entries = self.entries.write().await;
        if entries.contains_key(&entry.remote_id) {
            debug!(remote_id = %entry.remote_id, "Entry already cached, keeping first");
            return false;
        }
        entries.insert(entry.remote_id.clone(), entry);
        true
    }

    /// Drop an entry so the next request fetches it again.
    pub async fn invalidate(&self, remote_id: &str) -> Option<ResolutionCacheEntry> {
        self.entries.write().await.remove(remote_id)
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Whether a library load is running.
    pub fn is_loading(&self) -> bool {
        self.state.load(Ordering::SeqCst) == LOADING
    }

    /// Move from idle to loading. `None` when a load is already running.
    fn try_begin_loading(&self) -> Option<LoadingGuard<'_>> {
        self.state
            .compare_exchange(IDLE, LOADING, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| LoadingGuard { state: &self.state })
    }
}

/// Returns the cache to idle when the load ends, however it ends.
struct LoadingGuard<'a> {
    state: &'a AtomicU8,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.state.store(IDLE, Ordering::SeqCst);
    }
}

/// How one playlist was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ItemStatus {
    Cached,
    Loaded,
    NotFound,
    Errored,
}

/// Loads playlist details into a [`ResolutionCache`].
pub struct LibraryLoader {
    cache: Arc<ResolutionCache>,
    source: Arc<dyn PlaylistSource>,
    sink: Option<Arc<dyn PlaylistSink>>,
    throttle: Arc<dyn Throttle>,
    config: LibraryConfig,
}

impl LibraryLoader {
    pub fn new(
        cache: Arc<ResolutionCache>,
        source: Arc<dyn PlaylistSource>,
        throttle: Arc<dyn Throttle>,
        config: LibraryConfig,
    ) -> Self {
        Self {
            cache,
            source,
            sink: None,
            throttle,
            config,
        }
    }

    /// Persist loaded playlists to `sink`.
    pub fn with_sink(mut self, sink: Arc<dyn PlaylistSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn cache(&self) -> &Arc<ResolutionCache> {
        &self.cache
    }

    /// Load every playlist in `ids`.
    ///
    /// At most one load runs at a time; a call made while another is running
    /// does nothing and returns [`LoadOutcome::AlreadyLoading`]. Every id
    /// advances progress exactly once, whether it was cached, missing,
    /// loaded or failed.
    pub async fn load_details_in_background(&self, ids: Vec<String>) -> LoadOutcome {
        let Some(_guard) = self.cache.try_begin_loading() else {
            info!(requested = ids.len(), "Library load already running, ignoring request");
            return LoadOutcome::AlreadyLoading;
        };

        info!(playlists = ids.len(), "Starting library load");
        self.cache.begin_library_load(ids.len()).await;

        let outcomes = BatchRunner::new(self.config.batches(), self.throttle.clone())
            .run_batches(ids, |id| async move { Ok::<_, Infallible>(self.load_one(&id).await) })
            .await;

        let mut summary = LoadSummary::default();
        for outcome in outcomes {
            let status = match outcome {
                BatchOutcome::Succeeded { value, .. } => value,
                BatchOutcome::Failed { item, error } => {
                    // The worker died before recording anything.
                    self.store(ResolutionCacheEntry::errored(&item, error)).await;
                    self.cache.advance().await;
                    ItemStatus::Errored
                }
            };
            match status {
                ItemStatus::Cached => summary.cached += 1,
                ItemStatus::Loaded => summary.loaded += 1,
                ItemStatus::NotFound => summary.not_found += 1,
                ItemStatus::Errored => summary.errored += 1,
            }
        }

        info!(
            cached = summary.cached,
            loaded = summary.loaded,
            not_found = summary.not_found,
            errored = summary.errored,
            "Library load finished"
        );
        LoadOutcome::Completed(summary)
    }

    /// Run [`Self::load_details_in_background`] on a tokio task.
    pub fn spawn_background_load(self: &Arc<Self>, ids: Vec<String>) -> JoinHandle<LoadOutcome> {
        let loader = Arc::clone(self);
        tokio::spawn(async move { loader.load_details_in_background(ids).await })
    }

    /// Resolve a single playlist through the cache.
    ///
    /// Cached entries, negative ones included, are returned without any
    /// remote call. Does not touch load progress.
    pub async fn resolve_playlist(&self, remote_id: &str) -> ResolutionCacheEntry {
        if let Some(entry) = self.cache.get(remote_id).await {
            return entry;
        }

        let entry = self.fetch_entry(remote_id).await;
        self.store(entry.clone()).await;
        self.cache.get(remote_id).await.unwrap_or(entry)
    }

    async fn load_one(&self, remote_id: &str) -> ItemStatus {
        if self.cache.contains(remote_id).await {
            debug!(remote_id, "Playlist already cached");
            metrics::PLAYLISTS_LOADED.with_label_values(&["cached"]).inc();
            self.cache.advance().await;
            return ItemStatus::Cached;
        }

        let entry = self.fetch_entry(remote_id).await;
        let status = match entry.status {
            ResolutionStatus::Loaded => ItemStatus::Loaded,
            ResolutionStatus::NotFound => ItemStatus::NotFound,
            ResolutionStatus::Errored { .. } => ItemStatus::Errored,
        };

        let stored = self.store(entry).await;
        self.cache.advance().await;
        if !stored {
            // A concurrent load of the same id got there first.
            metrics::PLAYLISTS_LOADED.with_label_values(&["cached"]).inc();
            return ItemStatus::Cached;
        }
        status
    }

    /// Fetch metadata and tracks. Never fails: problems become negative entries.
    async fn fetch_entry(&self, remote_id: &str) -> ResolutionCacheEntry {
        let metadata = match self.source.fetch_playlist_metadata(remote_id).await {
            Ok(metadata) => metadata,
            Err(e) if e.is_not_found() => {
                debug!(remote_id, "Playlist not found, caching negative entry");
                return ResolutionCacheEntry::not_found(remote_id);
            }
            Err(e) => {
                warn!(
                    remote_id,
                    transient = e.is_transient(),
                    error = %e,
                    "Failed to fetch playlist metadata"
                );
                return ResolutionCacheEntry::errored(remote_id, e.to_string());
            }
        };

        let source = &self.source;
        let fetched = fetch_all_pages(
            None,
            self.throttle.as_ref(),
            self.config.page_delay(),
            |cursor| async move {
                source
                    .fetch_tracks_page(remote_id, cursor.as_deref())
                    .await
                    .map(Page::from)
            },
        )
        .await;

        match fetched.interrupted {
            Some(error) if fetched.pages == 0 => {
                warn!(remote_id, error = %error, "Failed to fetch any tracks");
                ResolutionCacheEntry::errored(remote_id, error)
            }
            interrupted => {
                if let Some(error) = interrupted {
                    warn!(
                        remote_id,
                        pages = fetched.pages,
                        error = %error,
                        "Track listing truncated"
                    );
                }
                ResolutionCacheEntry::loaded(remote_id, Some(metadata.name), fetched.items)
            }
        }
    }

    /// Cache an entry and persist it when loaded. Sink failures are only logged.
    ///
    /// Returns false when an entry for the id was already cached; nothing is
    /// counted or persisted then.
    async fn store(&self, entry: ResolutionCacheEntry) -> bool {
        let status = entry.status.as_str();
        let persist = entry.status == ResolutionStatus::Loaded;
        let snapshot = persist.then(|| entry.clone());
        if !self.cache.insert(entry).await {
            return false;
        }
        metrics::PLAYLISTS_LOADED.with_label_values(&[status]).inc();

        if let (Some(sink), Some(entry)) = (&self.sink, snapshot) {
            if let Err(e) = sink.persist_resolved_playlist(&entry) {
                metrics::SINK_FAILURES.inc();
                warn!(
                    remote_id = %entry.remote_id,
                    error = %e,
                    "Failed to persist resolved playlist"
                );
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fixtures, MockCatalog, MockPlaylistSink, RecordingThrottle};

    fn loader(catalog: &Arc<MockCatalog>) -> LibraryLoader {
        LibraryLoader::new(
            Arc::new(ResolutionCache::new()),
            catalog.clone(),
            Arc::new(RecordingThrottle::new()),
            LibraryConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_insert_is_write_once() {
        let cache = ResolutionCache::new();
        assert!(cache.insert(ResolutionCacheEntry::not_found("pl")).await);
        assert!(!cache.insert(ResolutionCacheEntry::loaded("pl", None, Vec::new())).await);
        assert_eq!(cache.get("pl").await.unwrap().status, ResolutionStatus::NotFound);

        assert!(cache.invalidate("pl").await.is_some());
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_store_counts_first_write_only() {
        let catalog = Arc::new(MockCatalog::new());
        let sink = Arc::new(MockPlaylistSink::new());
        let loader = loader(&catalog).with_sink(sink.clone());

        let entry = ResolutionCacheEntry::loaded("pl", None, fixtures::numbered_tracks("t", 2));
        assert!(loader.store(entry.clone()).await);
        assert!(!loader.store(entry).await);
        assert_eq!(sink.persisted().len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_ids_in_one_chunk_store_once() {
        let catalog = Arc::new(MockCatalog::new());
        catalog
            .add_playlist("dup", "Twice", fixtures::numbered_tracks("t", 2), 10)
            .await;
        let sink = Arc::new(MockPlaylistSink::new());
        let loader = loader(&catalog).with_sink(sink.clone());

        let outcome = loader
            .load_details_in_background(vec!["dup".to_string(), "dup".to_string()])
            .await;

        assert!(matches!(
            outcome,
            LoadOutcome::Completed(LoadSummary { loaded: 1, cached: 1, .. })
        ));
        assert_eq!(loader.cache().len().await, 1);
        assert_eq!(sink.persisted().len(), 1);
        assert_eq!(loader.cache().progress().await.loaded, 2);
    }

    #[tokio::test]
    async fn test_loading_guard_resets_state() {
        let cache = ResolutionCache::new();
        {
            let guard = cache.try_begin_loading();
            assert!(guard.is_some());
            assert!(cache.is_loading());
            assert!(cache.try_begin_loading().is_none());
        }
        assert!(!cache.is_loading());
    }

    #[tokio::test]
    async fn test_load_statuses_and_progress() {
        let catalog = Arc::new(MockCatalog::new());
        catalog
            .add_playlist("good", "Good", fixtures::numbered_tracks("t", 3), 2)
            .await;
        catalog.add_playlist("broken", "Broken", Vec::new(), 10).await;
        catalog.break_playlist("broken").await;

        let loader = loader(&catalog);
        let outcome = loader
            .load_details_in_background(vec![
                "good".to_string(),
                "missing".to_string(),
                "broken".to_string(),
            ])
            .await;

        assert_eq!(
            outcome,
            LoadOutcome::Completed(LoadSummary {
                cached: 0,
                loaded: 1,
                not_found: 1,
                errored: 1,
            })
        );

        let progress = loader.cache().progress().await;
        assert_eq!(progress.loaded, 3);
        assert!(progress.is_complete);

        let good = loader.cache().get("good").await.unwrap();
        assert_eq!(good.track_count, 3);
        assert_eq!(good.name.as_deref(), Some("Good"));
        assert!(matches!(
            loader.cache().get("broken").await.unwrap().status,
            ResolutionStatus::Errored { ref message } if message.contains("500")
        ));
    }

    #[tokio::test]
    async fn test_truncated_listing_is_still_loaded() {
        let catalog = Arc::new(MockCatalog::new());
        catalog
            .add_playlist("pl", "Long", fixtures::numbered_tracks("t", 5), 2)
            .await;
        catalog.fail_page("pl", 1).await;

        let entry = loader(&catalog).resolve_playlist("pl").await;
        assert_eq!(entry.status, ResolutionStatus::Loaded);
        assert_eq!(entry.track_count, 2);
    }

    #[tokio::test]
    async fn test_first_page_failure_is_errored() {
        let catalog = Arc::new(MockCatalog::new());
        catalog
            .add_playlist("pl", "Long", fixtures::numbered_tracks("t", 5), 2)
            .await;
        catalog.fail_page("pl", 0).await;

        let entry = loader(&catalog).resolve_playlist("pl").await;
        assert!(matches!(entry.status, ResolutionStatus::Errored { .. }));
    }

    #[tokio::test]
    async fn test_sink_failure_does_not_fail_load() {
        let catalog = Arc::new(MockCatalog::new());
        catalog
            .add_playlist("pl", "Mix", fixtures::numbered_tracks("t", 2), 10)
            .await;
        let sink = Arc::new(MockPlaylistSink::new());
        sink.set_failing(true);

        let loader = loader(&catalog).with_sink(sink.clone());
        let outcome = loader.load_details_in_background(vec!["pl".to_string()]).await;

        assert!(matches!(outcome, LoadOutcome::Completed(s) if s.loaded == 1));
        assert_eq!(
            loader.cache().get("pl").await.unwrap().status,
            ResolutionStatus::Loaded
        );
        assert!(sink.persisted().is_empty());
    }

    #[tokio::test]
    async fn test_only_loaded_entries_are_persisted() {
        let catalog = Arc::new(MockCatalog::new());
        catalog
            .add_playlist("pl", "Mix", fixtures::numbered_tracks("t", 2), 10)
            .await;
        let sink = Arc::new(MockPlaylistSink::new());

        let loader = loader(&catalog).with_sink(sink.clone());
        loader
            .load_details_in_background(vec!["pl".to_string(), "missing".to_string()])
            .await;

        let persisted = sink.persisted();
        assert_eq!(persisted.len(), 1);
        assert_eq!(persisted[0].remote_id, "pl");
    }

    #[tokio::test]
    async fn test_empty_load_completes() {
        let catalog = Arc::new(MockCatalog::new());
        let loader = loader(&catalog);

        let outcome = loader.load_details_in_background(Vec::new()).await;
        assert_eq!(outcome, LoadOutcome::Completed(LoadSummary::default()));
        assert!(loader.cache().progress().await.is_complete);
    }
}
