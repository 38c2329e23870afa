//! Mock persistence sink for testing.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::cache::ResolutionCacheEntry;
use crate::catalog::{PlaylistSink, SinkError};

/// Mock implementation of the PlaylistSink trait.
///
/// Records persisted entries and can be switched into a failing mode.
#[derive(Debug, Default)]
pub struct MockPlaylistSink {
    entries: Arc<Mutex<Vec<ResolutionCacheEntry>>>,
    failing: AtomicBool,
}

impl MockPlaylistSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every write fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Entries persisted so far, in write order.
    pub fn persisted(&self) -> Vec<ResolutionCacheEntry> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }
}

impl PlaylistSink for MockPlaylistSink {
    fn persist_resolved_playlist(&self, entry: &ResolutionCacheEntry) -> Result<(), SinkError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(SinkError::Database("disk full".to_string()));
        }

        self.entries
            .lock()
            .map_err(|e| SinkError::Database(e.to_string()))?
            .push(entry.clone());
        Ok(())
    }
}
