//! REST API module for playlist-rs
//!
//! Provides HTTP API endpoints for accounts, storage and playlists

pub mod auth;
pub mod files;
pub mod handlers;
pub mod playlists;
pub mod server;

pub use handlers::AppState;
pub use server::ApiServer;
