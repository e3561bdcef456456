//! Integration tests for the REST API

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use playlist_rs::api::{ApiServer, AppState};
use playlist_rs::config::Config;
use playlist_rs::storage::{LocalStorage, StorageNamespace};
use serde_json::{json, Value};
use sqlx::sqlite::SqlitePoolOptions;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

struct TestApp {
    router: Router,
    storage: Arc<LocalStorage>,
    _dir: TempDir,
}

async fn setup_with(configure: impl FnOnce(&mut Config)) -> TestApp {
    let dir = tempfile::tempdir().unwrap();

    let mut config = Config::default();
    config.storage.root_path = dir.path().to_str().unwrap().to_string();
    config.storage.page_size = 2;
    configure(&mut config);

    let db = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    let state = AppState::new(&config, db).await.unwrap();
    let storage = state.storage.clone();

    let server = ApiServer::new(state, "127.0.0.1:0".to_string(), 1024 * 1024);

    TestApp {
        router: server.router(),
        storage,
        _dir: dir,
    }
}

async fn setup() -> TestApp {
    setup_with(|_| {}).await
}

impl TestApp {
    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).unwrap()
        };
        (status, value)
    }

    async fn send_raw(&self, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, body.to_vec())
    }

    /// Register an account and return its bearer token
    async fn register(&self, username: &str) -> String {
        let (status, body) = self
            .send(json_request(
                Method::POST,
                "/api/tokenauth/register/false",
                None,
                json!({ "username": username, "password": "hunter2", "first_name": "Ada" }),
            ))
            .await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        body["data"]["access_token"].as_str().unwrap().to_string()
    }
}

fn json_request(method: Method, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn authed(method: Method, uri: &str, token: &str, body: Body) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(body)
        .unwrap()
}

fn get(uri: &str, token: &str) -> Request<Body> {
    authed(Method::GET, uri, token, Body::empty())
}

#[tokio::test]
async fn test_health() {
    let app = setup().await;

    let (status, body) = app
        .send(Request::get("/api/health").body(Body::empty()).unwrap())
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_register_issues_token() {
    let app = setup().await;

    let (status, body) = app
        .send(json_request(
            Method::POST,
            "/api/tokenauth/register/true",
            None,
            json!({ "username": "ada", "password": "hunter2" }),
        ))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "success");
    assert_eq!(body["data"]["username"], "ada");
    assert_eq!(body["data"]["token_type"], "Bearer");
    // Remember-me tokens last 30 days
    assert_eq!(body["data"]["expires_in"], 30 * 24 * 3600);
}

#[tokio::test]
async fn test_register_duplicate_username() {
    let app = setup().await;
    app.register("ada").await;

    let (status, body) = app
        .send(json_request(
            Method::POST,
            "/api/tokenauth/register/false",
            None,
            json!({ "username": "ada", "password": "other" }),
        ))
        .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["state"], "failed");
    assert_eq!(body["msg"], "Username is already in use.");
}

#[tokio::test]
async fn test_register_requires_credentials() {
    let app = setup().await;

    let (status, body) = app
        .send(json_request(
            Method::POST,
            "/api/tokenauth/register/false",
            None,
            json!({ "username": "  ", "password": "" }),
        ))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["state"], "failed");
}

#[tokio::test]
async fn test_login() {
    let app = setup().await;
    app.register("ada").await;

    let (status, body) = app
        .send(json_request(
            Method::PUT,
            "/api/tokenauth/login/false",
            None,
            json!({ "username": "ada", "password": "wrong" }),
        ))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["msg"], "Username or password is invalid");

    let (status, body) = app
        .send(json_request(
            Method::PUT,
            "/api/tokenauth/login/false",
            None,
            json!({ "username": "ada", "password": "hunter2" }),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["expires_in"], 3600);
    assert!(body["data"]["access_token"].as_str().is_some());
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    let app = setup().await;

    let (status, _) = app
        .send(Request::get("/api/tokenauth").body(Body::empty()).unwrap())
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app.send(get("/api/storage/usage", "not-a-jwt")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["state"], "failed");
}

#[tokio::test]
async fn test_account_info_for_new_account() {
    let app = setup().await;
    let token = app.register("ada").await;

    let (status, body) = app.send(get("/api/tokenauth", &token)).await;

    assert_eq!(status, StatusCode::OK);
    let info = &body["data"];
    assert_eq!(info["user_name"], "ada");
    assert_eq!(info["first_name"], "Ada");
    assert_eq!(info["is_authenticated"], true);
    assert_eq!(info["max_disc_space"], 10_000);
    assert_eq!(info["used_disc_space"], 0);
    assert_eq!(info["file_amount"], 0);
    assert_eq!(info["usage_complete"], true);
    assert_eq!(info["track_count"], 0);
    assert_eq!(info["playlist_count"], 0);
    assert!(info["sas_token"].as_str().unwrap().starts_with("sp=r&"));
}

#[tokio::test]
async fn test_upload_list_and_delete_files() {
    let app = setup().await;
    let token = app.register("ada").await;

    for (name, size) in [("a.mp3", 100), ("b.mp3", 200), ("c.mp3", 300)] {
        let (status, body) = app
            .send(authed(
                Method::PUT,
                &format!("/api/files/{}", name),
                &token,
                Body::from(vec![0u8; size]),
            ))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["size_in_bytes"], size);
    }

    // Page size 2 means the listing spans two pages
    let (status, body) = app.send(get("/api/files", &token)).await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|entry| entry["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["a.mp3", "b.mp3", "c.mp3"]);

    let (_, body) = app.send(get("/api/storage/usage", &token)).await;
    assert_eq!(body["data"]["status"], "complete");
    assert_eq!(body["data"]["item_count"], 3);
    assert_eq!(body["data"]["total_bytes"], 600);

    let (status, body) = app
        .send(authed(Method::DELETE, "/api/files/b.mp3", &token, Body::empty()))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], true);

    let (_, body) = app.send(get("/api/tokenauth", &token)).await;
    assert_eq!(body["data"]["file_amount"], 2);
}

#[tokio::test]
async fn test_upload_rejects_path_segments() {
    let app = setup().await;
    let token = app.register("ada").await;

    let (status, _) = app
        .send(authed(Method::PUT, "/api/files/..", &token, Body::from("x")))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_upload_over_quota() {
    let app = setup_with(|config| config.storage.quota_units = 0).await;
    let token = app.register("ada").await;

    let (status, body) = app
        .send(authed(
            Method::PUT,
            "/api/files/big.mp3",
            &token,
            Body::from(vec![1u8; 10]),
        ))
        .await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["msg"], "Storage quota exceeded.");
}

#[tokio::test]
async fn test_blob_download_with_access_credential() {
    let app = setup().await;
    let token = app.register("ada").await;

    let (_, body) = app.send(get("/api/tokenauth", &token)).await;
    let folder = body["data"]["folder"].as_str().unwrap().to_string();
    let sas = body["data"]["sas_token"].as_str().unwrap().to_string();

    let namespace = StorageNamespace::new(folder.clone()).unwrap();
    app.storage
        .put_blob(&namespace, "albums/intro.mp3", b"ID3-audio")
        .await
        .unwrap();

    let uri = format!("/files/{}/albums/intro.mp3?{}", folder, sas);
    let (status, data) = app
        .send_raw(Request::get(uri.as_str()).body(Body::empty()).unwrap())
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(data, b"ID3-audio");

    let missing = format!("/files/{}/albums/none.mp3?{}", folder, sas);
    let (status, _) = app
        .send_raw(Request::get(missing.as_str()).body(Body::empty()).unwrap())
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let other = StorageNamespace::generate();
    let forged = format!("/files/{}/albums/intro.mp3?{}", other, sas);
    let (status, _) = app
        .send_raw(Request::get(forged.as_str()).body(Body::empty()).unwrap())
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // The blob now counts toward usage
    let (_, body) = app.send(get("/api/storage/usage", &token)).await;
    assert_eq!(body["data"]["item_count"], 1);
    assert_eq!(body["data"]["total_bytes"], 9);
}

#[tokio::test]
async fn test_playlists_and_track_counts() {
    let app = setup().await;
    let token = app.register("ada").await;

    let (status, body) = app
        .send(json_request(
            Method::POST,
            "/api/playlists",
            Some(&token),
            json!({ "name": "Road trip" }),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    let playlist_id = body["data"]["id"].as_i64().unwrap();

    let tracks_uri = format!("/api/playlists/{}/tracks", playlist_id);
    for (title, source) in [
        ("Clip", "youtube"),
        ("Single", "spotify"),
        ("Demo", "mp3"),
        ("Live set", "cloud_mp3"),
        ("EP", "bandcamp"),
    ] {
        let (status, _) = app
            .send(json_request(
                Method::POST,
                &tracks_uri,
                Some(&token),
                json!({ "title": title, "address": format!("{}-address", title), "source": source }),
            ))
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (_, body) = app.send(get(&tracks_uri, &token)).await;
    let tracks = body["data"].as_array().unwrap();
    assert_eq!(tracks.len(), 5);
    let first_track = tracks[0]["id"].as_i64().unwrap();

    let (_, body) = app.send(get("/api/tokenauth", &token)).await;
    let info = &body["data"];
    assert_eq!(info["track_count"], 5);
    assert_eq!(info["youtube_track_count"], 1);
    assert_eq!(info["spotify_track_count"], 1);
    assert_eq!(info["mp3_track_count"], 2);
    assert_eq!(info["bandcamp_track_count"], 1);
    assert_eq!(info["playlist_count"], 1);

    let (status, _) = app
        .send(authed(
            Method::DELETE,
            &format!("/api/tracks/{}", first_track),
            &token,
            Body::empty(),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .send(authed(
            Method::DELETE,
            &format!("/api/playlists/{}", playlist_id),
            &token,
            Body::empty(),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = app.send(get("/api/playlists", &token)).await;
    assert!(body["data"].as_array().unwrap().is_empty());

    let (status, _) = app
        .send(authed(
            Method::DELETE,
            &format!("/api/playlists/{}", playlist_id),
            &token,
            Body::empty(),
        ))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_tracks_of_foreign_playlist_are_hidden() {
    let app = setup().await;
    let owner = app.register("ada").await;
    let intruder = app.register("eve").await;

    let (_, body) = app
        .send(json_request(
            Method::POST,
            "/api/playlists",
            Some(&owner),
            json!({ "name": "Private" }),
        ))
        .await;
    let playlist_id = body["data"]["id"].as_i64().unwrap();

    let (status, _) = app
        .send(json_request(
            Method::POST,
            &format!("/api/playlists/{}/tracks", playlist_id),
            Some(&intruder),
            json!({ "title": "Spam", "address": "x", "source": "youtube" }),
        ))
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}
