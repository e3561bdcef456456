//! Playlist and track types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where a track is played from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackSource {
    #[serde(rename = "youtube")]
    YouTube,
    Spotify,
    /// MP3 uploaded into the user's file share
    Mp3,
    Bandcamp,
    /// MP3 held in the user's blob container
    CloudMp3,
}

impl TrackSource {
    /// Stable code persisted in the tracks table
    pub fn code(&self) -> i64 {
        match self {
            TrackSource::YouTube => 1,
            TrackSource::Spotify => 2,
            TrackSource::Mp3 => 3,
            TrackSource::Bandcamp => 4,
            TrackSource::CloudMp3 => 5,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(TrackSource::YouTube),
            2 => Some(TrackSource::Spotify),
            3 => Some(TrackSource::Mp3),
            4 => Some(TrackSource::Bandcamp),
            5 => Some(TrackSource::CloudMp3),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Playlist {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Track {
    pub id: i64,
    pub playlist_id: i64,
    pub user_id: i64,
    pub title: String,
    /// Provider id, URL or file name depending on the source
    pub address: String,
    pub source: TrackSource,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePlaylistRequest {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddTrackRequest {
    pub title: String,
    pub address: String,
    pub source: TrackSource,
}

/// Per-source track counts for one user
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TrackStats {
    pub total: i64,
    pub youtube: i64,
    pub spotify: i64,
    /// Uploaded and cloud MP3s together
    pub mp3: i64,
    pub bandcamp: i64,
    pub playlists: i64,
}
