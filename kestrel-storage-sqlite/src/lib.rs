//! SQLite storage backend for kestrel
//!
//! ```rust,ignore
//! use kestrel_storage_sqlite::SqliteStorage;
//!
//! let storage = SqliteStorage::connect("sqlite://kestrel.db").await?;
//! storage.migrate().await?;
//! let provider = storage.into_repository_provider();
//! ```
//!
//! Timestamps are stored as unix seconds, except login attempts which keep
//! milliseconds.

pub mod migrations;
pub mod repositories;

use std::str::FromStr;

use chrono::DateTime;
use kestrel_core::{Error, User, UserId, error::StorageError, repositories::RepositoryProvider};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

pub use repositories::SqliteRepositoryProvider;

#[derive(Debug, Clone)]
pub struct SqliteStorage {
    pool: SqlitePool,
}

impl SqliteStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open a pool for `database_url`, creating the database file if needed.
    pub async fn connect(database_url: &str) -> Result<Self, Error> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| {
                tracing::error!(error = %e, "Invalid SQLite database URL");
                StorageError::Connection(format!("Invalid database URL: {database_url}"))
            })?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .connect_with(options)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to connect to SQLite");
                StorageError::Connection("Failed to connect to SQLite".to_string())
            })?;

        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn migrate(&self) -> Result<(), Error> {
        SqliteRepositoryProvider::new(self.pool.clone())
            .migrate()
            .await
    }

    pub fn into_repository_provider(self) -> SqliteRepositoryProvider {
        SqliteRepositoryProvider::new(self.pool)
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SqliteUser {
    id: String,
    email: String,
    name: Option<String>,
    created_at: i64,
    updated_at: i64,
}

impl TryFrom<SqliteUser> for User {
    type Error = Error;

    fn try_from(user: SqliteUser) -> Result<Self, Self::Error> {
        let timestamp = |secs: i64| {
            DateTime::from_timestamp(secs, 0)
                .ok_or_else(|| StorageError::Database(format!("Invalid timestamp: {secs}")))
        };

        Ok(User {
            id: UserId::new(&user.id),
            email: user.email,
            name: user.name,
            created_at: timestamp(user.created_at)?,
            updated_at: timestamp(user.updated_at)?,
        })
    }
}
