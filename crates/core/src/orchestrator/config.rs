//! Orchestration timing configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::batch::BatchConfig;

/// Configuration for playlist sync.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Tracks resolved concurrently per chunk.
    #[serde(default = "default_resolve_batch_size")]
    pub resolve_batch_size: usize,

    /// Delay between resolution chunks (milliseconds).
    #[serde(default = "default_batch_delay")]
    pub resolve_delay_ms: u64,

    /// Track ids sent per add request.
    #[serde(default = "default_add_batch_size")]
    pub add_batch_size: usize,

    /// Delay between add requests (milliseconds).
    #[serde(default = "default_batch_delay")]
    pub add_delay_ms: u64,

    /// Delay between source playlist pages (milliseconds).
    #[serde(default = "default_page_delay")]
    pub page_delay_ms: u64,
}

fn default_resolve_batch_size() -> usize {
    5
}

fn default_add_batch_size() -> usize {
    25
}

fn default_batch_delay() -> u64 {
    1000 // 1 second
}

fn default_page_delay() -> u64 {
    100
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            resolve_batch_size: default_resolve_batch_size(),
            resolve_delay_ms: default_batch_delay(),
            add_batch_size: default_add_batch_size(),
            add_delay_ms: default_batch_delay(),
            page_delay_ms: default_page_delay(),
        }
    }
}

impl SyncConfig {
    /// Chunking used for track resolution.
    pub fn resolve_batches(&self) -> BatchConfig {
        BatchConfig::new(self.resolve_batch_size, Duration::from_millis(self.resolve_delay_ms))
    }

    /// Chunking used for playlist mutation.
    pub fn add_batches(&self) -> BatchConfig {
        BatchConfig::new(self.add_batch_size, Duration::from_millis(self.add_delay_ms))
    }

    /// Delay between pages.
    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.resolve_batch_size == 0 {
            return Err("resolve_batch_size must be at least 1".to_string());
        }
        if self.add_batch_size == 0 {
            return Err("add_batch_size must be at least 1".to_string());
        }
        Ok(())
    }
}

/// Configuration for background library loading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibraryConfig {
    /// Playlists loaded concurrently per chunk.
    #[serde(default = "default_library_batch_size")]
    pub batch_size: usize,

    /// Delay between chunks (milliseconds).
    #[serde(default = "default_batch_delay")]
    pub batch_delay_ms: u64,

    /// Delay between track pages of one playlist (milliseconds).
    #[serde(default = "default_page_delay")]
    pub page_delay_ms: u64,
}

fn default_library_batch_size() -> usize {
    5
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            batch_size: default_library_batch_size(),
            batch_delay_ms: default_batch_delay(),
            page_delay_ms: default_page_delay(),
        }
    }
}

impl LibraryConfig {
    /// Chunking used for playlist loading.
    pub fn batches(&self) -> BatchConfig {
        BatchConfig::new(self.batch_size, Duration::from_millis(self.batch_delay_ms))
    }

    /// Delay between pages.
    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.batch_size == 0 {
            return Err("library batch_size must be at least 1".to_string());
        }
        Ok(())
    }
}
