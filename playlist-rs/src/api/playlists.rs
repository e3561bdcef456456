//! API endpoints for playlists and tracks

use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;

use crate::api::auth::Claims;
use crate::api::handlers::{ApiResult, AppState, RequestResult};
use crate::error::PlaylistError;
use crate::playlists::{AddTrackRequest, CreatePlaylistRequest, Playlist, Track};

/// GET /api/playlists - List the caller's playlists
pub async fn list_playlists(
    State(state): State<Arc<AppState>>,
    claims: Claims,
) -> ApiResult<Vec<Playlist>> {
    let playlists = state.playlists.list_playlists(claims.uid).await?;
    Ok(RequestResult::success(playlists))
}

/// POST /api/playlists - Create a playlist
pub async fn create_playlist(
    State(state): State<Arc<AppState>>,
    claims: Claims,
    Json(payload): Json<CreatePlaylistRequest>,
) -> ApiResult<Playlist> {
    let playlist = state.playlists.create_playlist(claims.uid, payload).await?;
    Ok(RequestResult::success(playlist))
}

/// DELETE /api/playlists/:id - Delete a playlist and its tracks
pub async fn delete_playlist(
    State(state): State<Arc<AppState>>,
    claims: Claims,
    Path(playlist_id): Path<i64>,
) -> ApiResult<i64> {
    if !state.playlists.delete_playlist(claims.uid, playlist_id).await? {
        return Err(PlaylistError::NotFound(format!("playlist {}", playlist_id)));
    }
    Ok(RequestResult::success(playlist_id))
}

/// GET /api/playlists/:id/tracks
pub async fn list_tracks(
    State(state): State<Arc<AppState>>,
    claims: Claims,
    Path(playlist_id): Path<i64>,
) -> ApiResult<Vec<Track>> {
    let tracks = state.playlists.list_tracks(claims.uid, playlist_id).await?;
    Ok(RequestResult::success(tracks))
}

/// POST /api/playlists/:id/tracks
pub async fn add_track(
    State(state): State<Arc<AppState>>,
    claims: Claims,
    Path(playlist_id): Path<i64>,
    Json(payload): Json<AddTrackRequest>,
) -> ApiResult<Track> {
    let track = state
        .playlists
        .add_track(claims.uid, playlist_id, payload)
        .await?;
    Ok(RequestResult::success(track))
}

/// DELETE /api/tracks/:id
pub async fn delete_track(
    State(state): State<Arc<AppState>>,
    claims: Claims,
    Path(track_id): Path<i64>,
) -> ApiResult<i64> {
    if !state.playlists.delete_track(claims.uid, track_id).await? {
        return Err(PlaylistError::NotFound(format!("track {}", track_id)));
    }
    Ok(RequestResult::success(track_id))
}
