//! SQLite-backed persistence sink for resolved playlists.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::types::{ResolutionCacheEntry, ResolutionStatus, TrackRecord};
use crate::catalog::{PlaylistSink, SinkError};

/// SQLite-backed playlist sink.
pub struct SqlitePlaylistSink {
    conn: Mutex<Connection>,
}

impl SqlitePlaylistSink {
    /// Open a sink, creating the database file and tables if needed.
    pub fn new(path: &Path) -> Result<Self, SinkError> {
        let conn = Connection::open(path).map_err(|e| SinkError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory sink (useful for testing).
    pub fn in_memory() -> Result<Self, SinkError> {
        let conn = Connection::open_in_memory().map_err(|e| SinkError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), SinkError> {
        conn.execute_batch(
            r#"
            -- One row per resolved playlist
            CREATE TABLE IF NOT EXISTS resolved_playlists (
                remote_id TEXT PRIMARY KEY,
                name TEXT,
                status TEXT NOT NULL,
                error_message TEXT,
                track_count INTEGER NOT NULL,
                total_duration_ms INTEGER NOT NULL,
                resolved_at TEXT NOT NULL,
                persisted_at TEXT NOT NULL
            );

            -- Tracks of each resolved playlist
            CREATE TABLE IF NOT EXISTS resolved_playlist_tracks (
                remote_id TEXT NOT NULL REFERENCES resolved_playlists(remote_id),
                track_id TEXT NOT NULL,
                name TEXT NOT NULL,
                artist TEXT NOT NULL,
                album TEXT NOT NULL,
                duration_ms INTEGER,
                PRIMARY KEY (remote_id, track_id)
            );

            CREATE INDEX IF NOT EXISTS idx_resolved_playlists_status ON resolved_playlists(status);
            "#,
        )
        .map_err(|e| SinkError::Database(e.to_string()))?;

        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, SinkError> {
        self.conn
            .lock()
            .map_err(|e| SinkError::Database(format!("connection lock poisoned: {}", e)))
    }

    /// Load a persisted entry.
    pub fn get(&self, remote_id: &str) -> Result<Option<ResolutionCacheEntry>, SinkError> {
        let conn = self.lock()?;

        let row = conn
            .query_row(
                "SELECT name, status, error_message, track_count, total_duration_ms, resolved_at
                 FROM resolved_playlists WHERE remote_id = ?",
                params![remote_id],
                |row| {
                    Ok((
                        row.get::<_, Option<String>>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, Option<String>>(2)?,
                        row.get::<_, i64>(3)?,
                        row.get::<_, i64>(4)?,
                        row.get::<_, String>(5)?,
                    ))
                },
            )
            .optional()
            .map_err(|e| SinkError::Database(e.to_string()))?;

        let Some((name, status, error_message, track_count, total_duration_ms, resolved_at)) = row
        else {
            return Ok(None);
        };

        let status = match status.as_str() {
            "loaded" => ResolutionStatus::Loaded,
            "not_found" => ResolutionStatus::NotFound,
            "errored" => ResolutionStatus::Errored {
                message: error_message.unwrap_or_default(),
            },
            other => {
                return Err(SinkError::Serialization(format!(
                    "unknown status '{}' for {}",
                    other, remote_id
                )))
            }
        };

        let resolved_at = DateTime::parse_from_rfc3339(&resolved_at)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());

        Ok(Some(ResolutionCacheEntry {
            remote_id: remote_id.to_string(),
            name,
            tracks: Self::load_tracks(&conn, remote_id)?,
            track_count: track_count as usize,
            total_duration_ms: total_duration_ms as u64,
            status,
            resolved_at,
        }))
    }

    /// Number of persisted playlists.
    pub fn count(&self) -> Result<usize, SinkError> {
        let conn = self.lock()?;
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM resolved_playlists", [], |row| row.get(0))
            .map_err(|e| SinkError::Database(e.to_string()))?;
        Ok(count as usize)
    }

    fn load_tracks(
        conn: &Connection,
        remote_id: &str,
    ) -> Result<BTreeMap<String, TrackRecord>, SinkError> {
        let mut stmt = conn
            .prepare(
                "SELECT track_id, name, artist, album, duration_ms
                 FROM resolved_playlist_tracks WHERE remote_id = ?",
            )
            .map_err(|e| SinkError::Database(e.to_string()))?;

        let rows = stmt
            .query_map(params![remote_id], |row| {
                Ok(TrackRecord {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    artist: row.get(2)?,
                    album: row.get(3)?,
                    duration_ms: row.get::<_, Option<i64>>(4)?.map(|d| d as u64),
                })
            })
            .map_err(|e| SinkError::Database(e.to_string()))?;

        let mut tracks = BTreeMap::new();
        for row in rows {
            let track = row.map_err(|e| SinkError::Database(e.to_string()))?;
            tracks.insert(track.id.clone(), track);
        }
        Ok(tracks)
    }
}

impl PlaylistSink for SqlitePlaylistSink {
    fn persist_resolved_playlist(&self, entry: &ResolutionCacheEntry) -> Result<(), SinkError> {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction()
            .map_err(|e| SinkError::Database(e.to_string()))?;

        let error_message = match &entry.status {
            ResolutionStatus::Errored { message } => Some(message.as_str()),
            _ => None,
        };

        tx.execute(
            "DELETE FROM resolved_playlist_tracks WHERE remote_id = ?",
            params![&entry.remote_id],
        )
        .map_err(|e| SinkError::Database(e.to_string()))?;

        tx.execute(
            "INSERT OR REPLACE INTO resolved_playlists
                (remote_id, name, status, error_message, track_count, total_duration_ms, resolved_at, persisted_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                &entry.remote_id,
                &entry.name,
                entry.status.as_str(),
                error_message,
                entry.track_count as i64,
                entry.total_duration_ms as i64,
                entry.resolved_at.to_rfc3339(),
                Utc::now().to_rfc3339(),
            ],
        )
        .map_err(|e| SinkError::Database(e.to_string()))?;

        for track in entry.tracks.values() {
            tx.execute(
                "INSERT INTO resolved_playlist_tracks (remote_id, track_id, name, artist, album, duration_ms)
                 VALUES (?, ?, ?, ?, ?, ?)",
                params![
                    &entry.remote_id,
                    &track.id,
                    &track.name,
                    &track.artist,
                    &track.album,
                    track.duration_ms.map(|d| d as i64),
                ],
            )
            .map_err(|e| SinkError::Database(e.to_string()))?;
        }

        tx.commit().map_err(|e| SinkError::Database(e.to_string()))?;
        Ok(())
    }
}
