//! API Server - HTTP server for REST API

use axum::{
    extract::{DefaultBodyLimit, FromRequestParts, State},
    http::{header::AUTHORIZATION, request::Parts, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::api::auth::Claims;
use crate::api::handlers::{self, AppState, RequestResult};
use crate::api::{files, playlists};

/// API Server configuration
pub struct ApiServer {
    state: Arc<AppState>,
    addr: String,
    max_upload_bytes: usize,
}

impl ApiServer {
    /// Create a new API server
    pub fn new(state: AppState, addr: String, max_upload_bytes: usize) -> Self {
        Self {
            state: Arc::new(state),
            addr,
            max_upload_bytes,
        }
    }

    /// Build the router with all routes
    pub fn router(&self) -> Router {
        // CORS configuration
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        // Public routes (no auth required)
        let public_routes = Router::new()
            .route("/health", get(handlers::health))
            .route("/tokenauth/register/:remember_me", post(handlers::register))
            .route("/tokenauth/login/:remember_me", put(handlers::login));

        // Protected routes (auth required)
        let protected_routes = Router::new()
            .route("/tokenauth", get(handlers::account_info))
            .route("/storage/usage", get(handlers::storage_usage))
            .route("/files", get(files::list_files))
            .route(
                "/files/:name",
                put(files::upload_file).delete(files::delete_file),
            )
            .route(
                "/playlists",
                get(playlists::list_playlists).post(playlists::create_playlist),
            )
            .route("/playlists/:id", delete(playlists::delete_playlist))
            .route(
                "/playlists/:id/tracks",
                get(playlists::list_tracks).post(playlists::add_track),
            )
            .route("/tracks/:id", delete(playlists::delete_track))
            .route_layer(middleware::from_fn_with_state(
                self.state.clone(),
                auth_middleware,
            ));

        // Blob downloads authorised by an access credential
        let blob_routes = Router::new().route("/files/:namespace/*name", get(files::download_blob));

        // Combine all routes
        Router::new()
            .nest("/api", public_routes.merge(protected_routes))
            .merge(blob_routes)
            .layer(DefaultBodyLimit::max(self.max_upload_bytes))
            .layer(TraceLayer::new_for_http())
            .layer(cors)
            .with_state(self.state.clone())
    }

    /// Start the API server
    pub async fn run(&self) -> std::io::Result<()> {
        let router = self.router();

        info!("Starting API server on {}", self.addr);

        let listener = tokio::net::TcpListener::bind(&self.addr).await?;
        axum::serve(listener, router).await?;

        Ok(())
    }
}

/// Authentication middleware - validates JWT token
async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    // Extract Authorization header
    let auth_header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let token = match auth_header.and_then(|h| h.strip_prefix("Bearer ")) {
        Some(token) => token,
        None => {
            warn!("Missing or invalid Authorization header");
            return (
                StatusCode::UNAUTHORIZED,
                RequestResult::failed("Missing or invalid Authorization header"),
            )
                .into_response();
        }
    };

    // Validate token
    match state.jwt_config.validate_token(token) {
        Ok(claims) => {
            // Store claims in request extensions for handlers
            req.extensions_mut().insert(claims);
            next.run(req).await
        }
        Err(e) => {
            warn!("Invalid JWT token: {}", e);
            (
                StatusCode::UNAUTHORIZED,
                RequestResult::failed("Invalid or expired token"),
            )
                .into_response()
        }
    }
}

/// Extract Claims from request (for handlers)
#[axum::async_trait]
impl<S> FromRequestParts<S> for Claims
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<Claims>().cloned().ok_or_else(|| {
            (
                StatusCode::UNAUTHORIZED,
                RequestResult::failed("Not authenticated"),
            )
                .into_response()
        })
    }
}
