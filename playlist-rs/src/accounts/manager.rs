//! Account manager - user records and credential checks

use crate::accounts::types::{RegisterRequest, User};
use crate::error::{PlaylistError, Result};
use crate::security::{hash_password, verify_password};
use crate::storage::StorageNamespace;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{debug, info, warn};

/// Manages registered users
#[derive(Clone)]
pub struct AccountManager {
    db: SqlitePool,
}

impl AccountManager {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Initialize database tables
    pub async fn init_db(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                first_name TEXT,
                last_name TEXT,
                file_folder TEXT NOT NULL UNIQUE,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.db)
        .await?;

        Ok(())
    }

    /// Store a new user owning `file_folder`.
    ///
    /// Fails with [`PlaylistError::Conflict`] when the username is taken.
    pub async fn create_user(
        &self,
        request: &RegisterRequest,
        file_folder: &StorageNamespace,
    ) -> Result<User> {
        let username = request.username.trim();
        if username.is_empty() || request.password.is_empty() {
            return Err(PlaylistError::Parse(
                "username and password are required".to_string(),
            ));
        }

        let password_hash = hash_password(&request.password)?;
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO users (username, password_hash, first_name, last_name, file_folder, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(username)
        .bind(&password_hash)
        .bind(&request.first_name)
        .bind(&request.last_name)
        .bind(file_folder.as_str())
        .bind(now.to_rfc3339())
        .execute(&self.db)
        .await;

        let result = match result {
            Ok(result) => result,
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                return Err(PlaylistError::Conflict(format!(
                    "username {} already registered",
                    username
                )));
            }
            Err(e) => return Err(e.into()),
        };

        info!("Registered user {} with folder {}", username, file_folder);

        self.get_user(result.last_insert_rowid())
            .await?
            .ok_or_else(|| PlaylistError::NotFound("Failed to retrieve created user".to_string()))
    }

    pub async fn get_user(&self, id: i64) -> Result<Option<User>> {
        let row = sqlx::query(
            r#"
            SELECT id, username, password_hash, first_name, last_name, file_folder, created_at
            FROM users
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        row.map(row_to_user).transpose()
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let row = sqlx::query(
            r#"
            SELECT id, username, password_hash, first_name, last_name, file_folder, created_at
            FROM users
            WHERE username = ?
            "#,
        )
        .bind(username.trim())
        .fetch_optional(&self.db)
        .await?;

        row.map(row_to_user).transpose()
    }

    /// Return the user when the password matches
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<Option<User>> {
        debug!("Authentication attempt for {}", username);

        let Some(user) = self.find_by_username(username).await? else {
            warn!("Authentication failed: user not found: {}", username);
            return Ok(None);
        };

        if verify_password(password, &user.password_hash)? {
            Ok(Some(user))
        } else {
            warn!("Authentication failed: wrong password for {}", username);
            Ok(None)
        }
    }

    pub async fn list_users(&self) -> Result<Vec<User>> {
        let rows = sqlx::query(
            r#"
            SELECT id, username, password_hash, first_name, last_name, file_folder, created_at
            FROM users
            ORDER BY username
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(row_to_user).collect()
    }

    pub async fn count_users(&self) -> Result<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&self.db)
            .await?;

        Ok(count.0)
    }
}

fn row_to_user(row: sqlx::sqlite::SqliteRow) -> Result<User> {
    use sqlx::Row;

    let file_folder: String = row.try_get("file_folder")?;
    let created_at: String = row.try_get("created_at")?;

    Ok(User {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        password_hash: row.try_get("password_hash")?,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        file_folder: StorageNamespace::new(file_folder)?,
        created_at: DateTime::parse_from_rfc3339(&created_at)
            .map_err(|e| PlaylistError::Parse(e.to_string()))?
            .with_timezone(&Utc),
    })
}
