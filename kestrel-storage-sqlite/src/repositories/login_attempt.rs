//! SQLite implementation of the login attempt log.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kestrel_core::{
    Error, LoginAttempt, error::StorageError, repositories::LoginAttemptRepository,
};
use sqlx::SqlitePool;

pub struct SqliteLoginAttemptRepository {
    pool: SqlitePool,
}

impl SqliteLoginAttemptRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SqliteLoginAttempt {
    ip_address: String,
    identifier: String,
    success: bool,
    /// Unix milliseconds
    attempted_at: i64,
}

impl TryFrom<SqliteLoginAttempt> for LoginAttempt {
    type Error = Error;

    fn try_from(row: SqliteLoginAttempt) -> Result<Self, Self::Error> {
        let attempted_at = DateTime::from_timestamp_millis(row.attempted_at).ok_or_else(|| {
            StorageError::Database(format!("Invalid attempted_at: {}", row.attempted_at))
        })?;

        Ok(LoginAttempt::new(
            row.ip_address,
            row.identifier,
            row.success,
            attempted_at,
        ))
    }
}

#[async_trait]
impl LoginAttemptRepository for SqliteLoginAttemptRepository {
    async fn record(&self, attempt: &LoginAttempt) -> Result<(), Error> {
        sqlx::query(
            r#"
            INSERT INTO login_attempts (ip_address, identifier, success, attempted_at)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(&attempt.ip_address)
        .bind(&attempt.identifier)
        .bind(attempt.success)
        .bind(attempt.attempted_at.timestamp_millis())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to record login attempt");
            StorageError::Database("Failed to record login attempt".to_string())
        })?;

        Ok(())
    }

    async fn find_since(
        &self,
        ip_address: &str,
        identifier: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<LoginAttempt>, Error> {
        let rows = sqlx::query_as::<_, SqliteLoginAttempt>(
            r#"
            SELECT ip_address, identifier, success, attempted_at
            FROM login_attempts
            WHERE ip_address = ?1 AND identifier = ?2 AND attempted_at >= ?3
            "#,
        )
        .bind(ip_address)
        .bind(identifier)
        .bind(since.timestamp_millis())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to fetch login attempts");
            StorageError::Database("Failed to fetch login attempts".to_string())
        })?;

        rows.into_iter().map(TryInto::try_into).collect()
    }
}
