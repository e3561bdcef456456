use crate::error::{PlaylistError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub auth: AuthConfig,
    pub access: AccessConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub listen_addr: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Root directory holding `shares/` and `containers/`
    pub root_path: String,
    #[serde(default = "default_audio_directory")]
    pub audio_directory: String,
    /// Entries returned per listing page
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// Quota granted to every account, in GB-sized units
    #[serde(default = "default_quota_units")]
    pub quota_units: u32,
    /// Upper bound on a usage traversal; unbounded when absent
    pub traversal_timeout_secs: Option<u64>,
    /// Largest accepted upload body
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    #[serde(default = "default_session_hours")]
    pub session_hours: u64,
    #[serde(default = "default_remember_me_days")]
    pub remember_me_days: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AccessConfig {
    pub signing_key: String,
    #[serde(default = "default_validity_hours")]
    pub validity_hours: i64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

fn default_audio_directory() -> String {
    "audio".to_string()
}

fn default_page_size() -> usize {
    100
}

fn default_quota_units() -> u32 {
    10
}

fn default_max_upload_bytes() -> usize {
    50 * 1024 * 1024 // 50MB
}

fn default_session_hours() -> u64 {
    1
}

fn default_remember_me_days() -> u64 {
    30
}

fn default_validity_hours() -> i64 {
    24
}

impl StorageConfig {
    pub fn traversal_timeout(&self) -> Option<Duration> {
        self.traversal_timeout_secs.map(Duration::from_secs)
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| PlaylistError::Config(e.to_string()))?;

        let config: Config =
            toml::from_str(&content).map_err(|e| PlaylistError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.storage.page_size == 0 {
            return Err(PlaylistError::Config(
                "storage.page_size must be greater than zero".to_string(),
            ));
        }
        if self.storage.audio_directory.is_empty() || self.storage.audio_directory.contains('/') {
            return Err(PlaylistError::Config(format!(
                "storage.audio_directory must be a single path segment, got {:?}",
                self.storage.audio_directory
            )));
        }
        if self.access.validity_hours <= 0 {
            return Err(PlaylistError::Config(
                "access.validity_hours must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn default() -> Self {
        Self {
            server: ServerConfig {
                listen_addr: "0.0.0.0:8080".to_string(),
            },
            database: DatabaseConfig {
                url: "sqlite://playlist.db?mode=rwc".to_string(),
            },
            storage: StorageConfig {
                root_path: "/tmp/playlist-storage".to_string(),
                audio_directory: default_audio_directory(),
                page_size: default_page_size(),
                quota_units: default_quota_units(),
                traversal_timeout_secs: None,
                max_upload_bytes: default_max_upload_bytes(),
            },
            auth: AuthConfig {
                jwt_secret: "change-me-in-production".to_string(),
                session_hours: default_session_hours(),
                remember_me_days: default_remember_me_days(),
            },
            access: AccessConfig {
                signing_key: "change-me-in-production".to_string(),
                validity_hours: default_validity_hours(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        }
    }
}
