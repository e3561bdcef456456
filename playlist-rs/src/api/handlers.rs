//! API request handlers: health, registration, login and account info

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::{error, info};

use crate::accounts::{AccountManager, LoginRequest, RegisterRequest, User};
use crate::api::auth::{Claims, IssuedToken, JwtConfig};
use crate::config::Config;
use crate::error::{PlaylistError, Result};
use crate::playlists::PlaylistManager;
use crate::security::AccessCredentialIssuer;
use crate::storage::{LocalStorage, StorageNamespace};
use crate::usage::{ReporterSettings, StorageUsageReporter, UsageReport};

/// Shared application state
pub struct AppState {
    pub accounts: AccountManager,
    pub playlists: PlaylistManager,
    pub storage: Arc<LocalStorage>,
    pub reporter: StorageUsageReporter,
    pub jwt_config: JwtConfig,
    pub access: AccessCredentialIssuer,
    pub audio_directory: String,
}

impl AppState {
    /// Wire managers and stores from configuration, creating tables as needed
    pub async fn new(config: &Config, db: SqlitePool) -> Result<Self> {
        let accounts = AccountManager::new(db.clone());
        accounts.init_db().await?;
        let playlists = PlaylistManager::new(db);
        playlists.init_db().await?;

        let storage = Arc::new(LocalStorage::new(
            config.storage.root_path.clone(),
            config.storage.page_size,
        ));
        let reporter = StorageUsageReporter::new(
            storage.clone(),
            storage.clone(),
            ReporterSettings::from(&config.storage),
        );

        Ok(Self {
            accounts,
            playlists,
            storage,
            reporter,
            jwt_config: JwtConfig::new(
                config.auth.jwt_secret.clone(),
                config.auth.session_hours,
                config.auth.remember_me_days,
            ),
            access: AccessCredentialIssuer::new(
                &config.access.signing_key,
                config.access.validity_hours,
            ),
            audio_directory: config.storage.audio_directory.clone(),
        })
    }

    /// Resolve the account behind a validated token
    pub async fn current_user(&self, claims: &Claims) -> Result<User> {
        self.accounts
            .get_user(claims.uid)
            .await?
            .ok_or_else(|| PlaylistError::Unauthorized("account no longer exists".to_string()))
    }
}

/// Outcome flag of the response envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestState {
    Success,
    Failed,
}

/// Response envelope shared by every JSON endpoint
#[derive(Debug, Serialize)]
pub struct RequestResult<T: Serialize> {
    pub state: RequestState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> RequestResult<T> {
    pub fn success(data: T) -> Json<Self> {
        Json(Self {
            state: RequestState::Success,
            msg: None,
            data: Some(data),
        })
    }
}

impl RequestResult<()> {
    pub fn failed(msg: impl Into<String>) -> Json<Self> {
        Json(Self {
            state: RequestState::Failed,
            msg: Some(msg.into()),
            data: None,
        })
    }
}

pub type ApiResult<T> = std::result::Result<Json<RequestResult<T>>, PlaylistError>;

impl IntoResponse for PlaylistError {
    fn into_response(self) -> Response {
        let (status, msg) = match &self {
            PlaylistError::AuthenticationFailed => {
                (StatusCode::UNAUTHORIZED, "Username or password is invalid".to_string())
            }
            PlaylistError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            PlaylistError::Token(_) => (StatusCode::UNAUTHORIZED, "Invalid or expired token".to_string()),
            PlaylistError::NotFound(msg) => (StatusCode::NOT_FOUND, format!("Not found: {}", msg)),
            PlaylistError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            PlaylistError::Parse(msg) | PlaylistError::InvalidNamespace(msg) => {
                (StatusCode::BAD_REQUEST, msg.clone())
            }
            PlaylistError::StoreUnavailable(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "Storage is not available".to_string())
            }
            _ => {
                error!("Request failed: {}", self);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        (status, RequestResult::failed(msg)).into_response()
    }
}

/// Token payload returned by login and registration
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    #[serde(flatten)]
    pub token: IssuedToken,
    pub username: String,
}

/// Everything the account page shows
#[derive(Debug, Serialize)]
pub struct AccountInfo {
    pub id: i64,
    pub user_name: String,
    pub is_authenticated: bool,
    /// Quota in megabytes
    pub max_disc_space: u64,
    /// Usage in whole megabytes
    pub used_disc_space: u64,
    pub file_amount: u64,
    /// False when the usage figures are a lower bound
    pub usage_complete: bool,
    pub track_count: i64,
    pub spotify_track_count: i64,
    pub youtube_track_count: i64,
    pub mp3_track_count: i64,
    pub bandcamp_track_count: i64,
    pub playlist_count: i64,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub folder: StorageNamespace,
    /// Read-only access credential for the folder, as a query string
    pub sas_token: String,
    pub sas_expires_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// GET /api/health
pub async fn health() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "status": "ok",
            "version": env!("CARGO_PKG_VERSION"),
        })),
    )
}

/// POST /api/tokenauth/register/:remember_me - Create an account and its storage
pub async fn register(
    State(state): State<Arc<AppState>>,
    Path(remember_me): Path<bool>,
    Json(req): Json<RegisterRequest>,
) -> Response {
    if req.username.trim().is_empty() || req.password.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            RequestResult::failed("Username and password are required."),
        )
            .into_response();
    }

    match state.accounts.find_by_username(&req.username).await {
        Ok(Some(_)) => {
            return (
                StatusCode::CONFLICT,
                RequestResult::failed("Username is already in use."),
            )
                .into_response();
        }
        Ok(None) => {}
        Err(e) => return e.into_response(),
    }

    let folder = StorageNamespace::generate();
    if let Err(e) = state.storage.provision(&folder, &state.audio_directory).await {
        error!("Failed to provision storage for {}: {}", req.username, e);
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            RequestResult::failed("Cannot create share to cloud."),
        )
            .into_response();
    }

    let user = match state.accounts.create_user(&req, &folder).await {
        Ok(user) => user,
        Err(PlaylistError::Conflict(_)) => {
            return (
                StatusCode::CONFLICT,
                RequestResult::failed("Username is already in use."),
            )
                .into_response();
        }
        Err(e) => return e.into_response(),
    };

    issue_token(&state, &user, remember_me).into_response()
}

/// PUT /api/tokenauth/login/:remember_me - Authenticate and get JWT token
pub async fn login(
    State(state): State<Arc<AppState>>,
    Path(remember_me): Path<bool>,
    Json(req): Json<LoginRequest>,
) -> Response {
    match state.accounts.authenticate(&req.username, &req.password).await {
        Ok(Some(user)) => {
            info!("User {} logged in", user.username);
            issue_token(&state, &user, remember_me).into_response()
        }
        Ok(None) => PlaylistError::AuthenticationFailed.into_response(),
        Err(e) => e.into_response(),
    }
}

fn issue_token(state: &AppState, user: &User, remember_me: bool) -> ApiResult<TokenResponse> {
    let token = state
        .jwt_config
        .create_token(user.id, &user.username, remember_me)?;

    Ok(RequestResult::success(TokenResponse {
        token,
        username: user.username.clone(),
    }))
}

/// GET /api/tokenauth - Account info with storage usage and track counts
pub async fn account_info(
    State(state): State<Arc<AppState>>,
    claims: Claims,
) -> ApiResult<AccountInfo> {
    let user = state.current_user(&claims).await?;

    let stats = state.playlists.track_stats(user.id).await?;
    let report = state.reporter.compute_usage(&user.file_folder).await;
    let usage = report.summary();
    let credential = state.access.issue(&user.file_folder);

    Ok(RequestResult::success(AccountInfo {
        id: user.id,
        user_name: user.username.clone(),
        is_authenticated: true,
        max_disc_space: usage.quota_megabytes(),
        used_disc_space: usage.used_megabytes(),
        file_amount: usage.item_count,
        usage_complete: report.is_complete(),
        track_count: stats.total,
        spotify_track_count: stats.spotify,
        youtube_track_count: stats.youtube,
        mp3_track_count: stats.mp3,
        bandcamp_track_count: stats.bandcamp,
        playlist_count: stats.playlists,
        first_name: user.first_name.clone(),
        last_name: user.last_name.clone(),
        folder: user.file_folder.clone(),
        sas_expires_at: credential.expires_at(),
        sas_token: credential.to_query_string(),
    }))
}

/// GET /api/storage/usage - Raw usage report for the caller's folder
pub async fn storage_usage(
    State(state): State<Arc<AppState>>,
    claims: Claims,
) -> ApiResult<UsageReport> {
    let user = state.current_user(&claims).await?;
    let report = state.reporter.compute_usage(&user.file_folder).await;

    Ok(RequestResult::success(report))
}
