//! playlist-rs: Multi-source playlist backend
//!
//! Accounts keep playlists of tracks from YouTube, Spotify, Bandcamp and
//! uploaded MP3 files. Every account owns a storage namespace split into a
//! hierarchical file share and a flat blob container, and the storage usage
//! of that namespace is reported against a fixed quota.
//!
//! # Example
//!
//! ```no_run
//! use playlist_rs::storage::{LocalStorage, StorageNamespace};
//! use playlist_rs::usage::{ReporterSettings, StorageUsageReporter};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let storage = Arc::new(LocalStorage::new("/tmp/playlist-storage", 100));
//!     let reporter = StorageUsageReporter::new(
//!         storage.clone(),
//!         storage,
//!         ReporterSettings::default(),
//!     );
//!
//!     let namespace = StorageNamespace::new("3f1c5a8e")?;
//!     let report = reporter.compute_usage(&namespace).await;
//!     println!("{} items, {} bytes", report.summary().item_count, report.summary().total_bytes);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! - [`config`]: Configuration management
//! - [`error`]: Error types and handling
//! - [`storage`]: File share and blob container backends
//! - [`usage`]: Storage usage reporting
//! - [`accounts`]: User accounts
//! - [`playlists`]: Playlists and tracks
//! - [`security`]: Password hashing and access credentials
//! - [`api`]: REST API

pub mod accounts;
pub mod api;
pub mod config;
pub mod error;
pub mod playlists;
pub mod security;
pub mod storage;
pub mod usage;

// Re-export commonly used types
pub use config::Config;
pub use error::{PlaylistError, Result};
