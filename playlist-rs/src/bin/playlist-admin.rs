//! CLI tool for inspecting accounts and their storage usage
//!
//! # Usage
//!
//! ```bash
//! # List all accounts
//! playlist-admin list --config config.toml
//!
//! # Report storage usage of one account
//! playlist-admin usage ada --config config.toml
//!
//! # Report usage as JSON, giving up after 30 seconds
//! playlist-admin usage ada --json --timeout 30
//! ```

use clap::{Parser, Subcommand};
use playlist_rs::accounts::AccountManager;
use playlist_rs::config::Config;
use playlist_rs::storage::LocalStorage;
use playlist_rs::usage::{ReporterSettings, StorageUsageReporter, UsageReport};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "playlist-admin")]
#[command(about = "Inspect playlist-rs accounts and storage usage", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List all accounts
    List,
    /// Report storage usage of an account
    Usage {
        /// Account username
        username: String,
        /// Print the raw report as JSON
        #[arg(long)]
        json: bool,
        /// Give up on the traversal after this many seconds
        #[arg(long)]
        timeout: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };

    let db = SqlitePool::connect(&config.database.url).await?;
    let accounts = AccountManager::new(db);
    accounts.init_db().await?;

    match cli.command {
        Commands::List => {
            let users = accounts.list_users().await?;

            if users.is_empty() {
                println!("No accounts found.");
            } else {
                println!("{:<24} {:<38} {:<20}", "Username", "Folder", "Created At");
                println!("{:-<82}", "");

                for user in &users {
                    println!(
                        "{:<24} {:<38} {:<20}",
                        user.username,
                        user.file_folder,
                        user.created_at.format("%Y-%m-%d %H:%M:%S")
                    );
                }

                println!("\nTotal: {} account(s)", users.len());
            }
        }
        Commands::Usage {
            username,
            json,
            timeout,
        } => {
            let Some(user) = accounts.find_by_username(&username).await? else {
                eprintln!("Error: Account {} does not exist", username);
                std::process::exit(1);
            };

            let storage = Arc::new(LocalStorage::new(
                config.storage.root_path.clone(),
                config.storage.page_size,
            ));
            let mut settings = ReporterSettings::from(&config.storage);
            if let Some(secs) = timeout {
                settings.traversal_timeout = Some(Duration::from_secs(secs));
            }
            let reporter = StorageUsageReporter::new(storage.clone(), storage, settings);

            let report = reporter.compute_usage(&user.file_folder).await;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&username, &report);
            }
        }
    }

    Ok(())
}

fn print_report(username: &str, report: &UsageReport) {
    let summary = report.summary();

    println!("Storage usage for {}", username);
    println!("  Items:  {}", summary.item_count);
    println!("  Bytes:  {}", summary.total_bytes);
    println!(
        "  Used:   {} MB of {} MB ({:.1}%)",
        summary.used_megabytes(),
        summary.quota_megabytes(),
        summary.usage_percent()
    );

    if !report.is_complete() {
        println!("\n⚠ Partial report, totals are a lower bound:");
        for failure in report.failures() {
            println!(
                "  {:?} {:?} after {} page(s): {}",
                failure.store, failure.kind, failure.pages_read, failure.message
            );
        }
    }
}
