//! Playlists of tracks from several providers

pub mod manager;
pub mod types;

pub use manager::PlaylistManager;
pub use types::{
    AddTrackRequest, CreatePlaylistRequest, Playlist, Track, TrackSource, TrackStats,
};
