//! Batch orchestration of remote work.
//!
//! Everything that touches a rate-limited catalog in bulk goes through here:
//! - **Batches**: fixed-size chunks, sequential, concurrent within a chunk
//! - **Pagination**: cursor-following collection with partial results on error
//! - **Sync**: resolve a playlist's tracks and copy the matches

mod batch;
mod config;
mod pagination;
mod sync;
mod throttle;
mod types;

pub use batch::{BatchConfig, BatchOutcome, BatchReport, BatchRunner};
pub use config::{LibraryConfig, SyncConfig};
pub use pagination::{fetch_all_pages, Page, PagedFetch};
pub use sync::PlaylistSync;
pub use throttle::{Throttle, TokioThrottle};
pub use types::{SourcePlaylist, SyncError, SyncReport};
