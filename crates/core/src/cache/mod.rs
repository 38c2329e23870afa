//! Resolution cache and library loading progress.
//!
//! A [`ResolutionCache`] lives for one library-sync session and is shared
//! by `Arc`. It doubles as a negative cache: playlists found missing or
//! failing are remembered so they are not fetched again.

mod sqlite;
mod store;
mod types;

pub use sqlite::SqlitePlaylistSink;
pub use store::{LibraryLoader, ResolutionCache};
pub use types::{
    LoadOutcome, LoadSummary, LoadingProgress, ResolutionCacheEntry, ResolutionStatus, TrackRecord,
};
