use clap::Parser;
use playlist_rs::api::{ApiServer, AppState};
use playlist_rs::config::{Config, LoggingConfig};
use sqlx::SqlitePool;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "playlist-rs")]
#[command(about = "Playlist backend with per-user storage accounting", long_about = None)]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listen address (e.g., 127.0.0.1:8080)
    #[arg(short, long)]
    listen: Option<String>,
}

fn init_logging(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("playlist_rs={0},tower_http={0}", logging.level).into()
    });
    let json = logging.format.eq_ignore_ascii_case("json");

    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(|| tracing_subscriber::fmt::layer().pretty()))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load configuration
    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None if std::path::Path::new("config.toml").exists() => Config::from_file("config.toml")?,
        None => Config::default(),
    };
    if let Some(listen) = args.listen {
        config.server.listen_addr = listen;
    }

    init_logging(&config.logging);

    info!("Starting playlist-rs v{}", env!("CARGO_PKG_VERSION"));
    info!("  API listening on: {}", config.server.listen_addr);
    info!("  Storage root: {}", config.storage.root_path);
    info!("  Quota: {} units", config.storage.quota_units);

    let db = SqlitePool::connect(&config.database.url).await?;
    let state = AppState::new(&config, db).await?;

    let server = ApiServer::new(
        state,
        config.server.listen_addr.clone(),
        config.storage.max_upload_bytes,
    );
    server.run().await?;

    Ok(())
}
