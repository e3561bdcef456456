//! Playlist manager - playlists and their tracks, scoped to the owning user

use crate::error::{PlaylistError, Result};
use crate::playlists::types::{
    AddTrackRequest, CreatePlaylistRequest, Playlist, Track, TrackSource, TrackStats,
};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::info;

#[derive(Clone)]
pub struct PlaylistManager {
    db: SqlitePool,
}

impl PlaylistManager {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Initialize database tables
    pub async fn init_db(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS playlists (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                name TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.db)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS tracks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                playlist_id INTEGER NOT NULL,
                user_id INTEGER NOT NULL,
                title TEXT NOT NULL,
                address TEXT NOT NULL,
                source INTEGER NOT NULL,
                created_at TEXT NOT NULL,
                FOREIGN KEY (playlist_id) REFERENCES playlists(id) ON DELETE CASCADE
            )
            "#,
        )
        .execute(&self.db)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_tracks_user_source
            ON tracks(user_id, source)
            "#,
        )
        .execute(&self.db)
        .await?;

        Ok(())
    }

    pub async fn create_playlist(
        &self,
        user_id: i64,
        request: CreatePlaylistRequest,
    ) -> Result<Playlist> {
        let name = request.name.trim();
        if name.is_empty() {
            return Err(PlaylistError::Parse("playlist name is required".to_string()));
        }

        let result = sqlx::query(
            r#"
            INSERT INTO playlists (user_id, name, created_at)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(user_id)
        .bind(name)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.db)
        .await?;

        info!("User {} created playlist {:?}", user_id, name);

        self.get_playlist(user_id, result.last_insert_rowid())
            .await?
            .ok_or_else(|| PlaylistError::NotFound("Failed to retrieve created playlist".to_string()))
    }

    pub async fn get_playlist(&self, user_id: i64, playlist_id: i64) -> Result<Option<Playlist>> {
        let row = sqlx::query(
            r#"
            SELECT id, user_id, name, created_at
            FROM playlists
            WHERE id = ? AND user_id = ?
            "#,
        )
        .bind(playlist_id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;

        row.map(row_to_playlist).transpose()
    }

    pub async fn list_playlists(&self, user_id: i64) -> Result<Vec<Playlist>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, name, created_at
            FROM playlists
            WHERE user_id = ?
            ORDER BY id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(row_to_playlist).collect()
    }

    /// Delete a playlist and its tracks. Returns `false` if it was not found.
    pub async fn delete_playlist(&self, user_id: i64, playlist_id: i64) -> Result<bool> {
        let mut tx = self.db.begin().await?;

        sqlx::query("DELETE FROM tracks WHERE playlist_id = ? AND user_id = ?")
            .bind(playlist_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM playlists WHERE id = ? AND user_id = ?")
            .bind(playlist_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn add_track(
        &self,
        user_id: i64,
        playlist_id: i64,
        request: AddTrackRequest,
    ) -> Result<Track> {
        if self.get_playlist(user_id, playlist_id).await?.is_none() {
            return Err(PlaylistError::NotFound(format!("playlist {}", playlist_id)));
        }
        if request.address.trim().is_empty() {
            return Err(PlaylistError::Parse("track address is required".to_string()));
        }

        let result = sqlx::query(
            r#"
            INSERT INTO tracks (playlist_id, user_id, title, address, source, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(playlist_id)
        .bind(user_id)
        .bind(request.title.trim())
        .bind(request.address.trim())
        .bind(request.source.code())
        .bind(Utc::now().to_rfc3339())
        .execute(&self.db)
        .await?;

        self.get_track(user_id, result.last_insert_rowid())
            .await?
            .ok_or_else(|| PlaylistError::NotFound("Failed to retrieve created track".to_string()))
    }

    pub async fn get_track(&self, user_id: i64, track_id: i64) -> Result<Option<Track>> {
        let row = sqlx::query(
            r#"
            SELECT id, playlist_id, user_id, title, address, source, created_at
            FROM tracks
            WHERE id = ? AND user_id = ?
            "#,
        )
        .bind(track_id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;

        row.map(row_to_track).transpose()
    }

    pub async fn list_tracks(&self, user_id: i64, playlist_id: i64) -> Result<Vec<Track>> {
        if self.get_playlist(user_id, playlist_id).await?.is_none() {
            return Err(PlaylistError::NotFound(format!("playlist {}", playlist_id)));
        }

        let rows = sqlx::query(
            r#"
            SELECT id, playlist_id, user_id, title, address, source, created_at
            FROM tracks
            WHERE playlist_id = ? AND user_id = ?
            ORDER BY id
            "#,
        )
        .bind(playlist_id)
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(row_to_track).collect()
    }

    pub async fn delete_track(&self, user_id: i64, track_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM tracks WHERE id = ? AND user_id = ?")
            .bind(track_id)
            .bind(user_id)
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn track_count(&self, user_id: i64) -> Result<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM tracks WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(&self.db)
            .await?;

        Ok(count.0)
    }

    pub async fn track_count_by_source(&self, user_id: i64, source: TrackSource) -> Result<i64> {
        let count: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM tracks WHERE user_id = ? AND source = ?")
                .bind(user_id)
                .bind(source.code())
                .fetch_one(&self.db)
                .await?;

        Ok(count.0)
    }

    pub async fn playlist_count(&self, user_id: i64) -> Result<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM playlists WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(&self.db)
            .await?;

        Ok(count.0)
    }

    /// Counts shown on the account page
    pub async fn track_stats(&self, user_id: i64) -> Result<TrackStats> {
        Ok(TrackStats {
            total: self.track_count(user_id).await?,
            youtube: self.track_count_by_source(user_id, TrackSource::YouTube).await?,
            spotify: self.track_count_by_source(user_id, TrackSource::Spotify).await?,
            mp3: self.track_count_by_source(user_id, TrackSource::Mp3).await?
                + self.track_count_by_source(user_id, TrackSource::CloudMp3).await?,
            bandcamp: self.track_count_by_source(user_id, TrackSource::Bandcamp).await?,
            playlists: self.playlist_count(user_id).await?,
        })
    }
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(value)
        .map_err(|e| PlaylistError::Parse(e.to_string()))?
        .with_timezone(&Utc))
}

fn row_to_playlist(row: sqlx::sqlite::SqliteRow) -> Result<Playlist> {
    use sqlx::Row;

    let created_at: String = row.try_get("created_at")?;

    Ok(Playlist {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        name: row.try_get("name")?,
        created_at: parse_timestamp(&created_at)?,
    })
}

fn row_to_track(row: sqlx::sqlite::SqliteRow) -> Result<Track> {
    use sqlx::Row;

    let source: i64 = row.try_get("source")?;
    let created_at: String = row.try_get("created_at")?;

    Ok(Track {
        id: row.try_get("id")?,
        playlist_id: row.try_get("playlist_id")?,
        user_id: row.try_get("user_id")?,
        title: row.try_get("title")?,
        address: row.try_get("address")?,
        source: TrackSource::from_code(source)
            .ok_or_else(|| PlaylistError::Parse(format!("unknown track source {}", source)))?,
        created_at: parse_timestamp(&created_at)?,
    })
}
