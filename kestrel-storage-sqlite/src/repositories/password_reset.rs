use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kestrel_core::{
    Error, UserId, error::StorageError, repositories::PasswordResetRepository,
};
use sqlx::SqlitePool;

pub struct SqlitePasswordResetRepository {
    pool: SqlitePool,
}

impl SqlitePasswordResetRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PasswordResetRepository for SqlitePasswordResetRepository {
    async fn create_token(
        &self,
        user_id: &UserId,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), Error> {
        sqlx::query(
            "INSERT INTO password_reset_tokens (token_hash, user_id, expires_at) VALUES (?1, ?2, ?3)",
        )
        .bind(token_hash)
        .bind(user_id.as_str())
        .bind(expires_at.timestamp())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to create password reset token");
            StorageError::Database("Failed to create password reset token".to_string())
        })?;

        Ok(())
    }

    async fn consume_token(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<UserId>, Error> {
        // Single statement so two concurrent resets cannot both succeed
        let user_id = sqlx::query_scalar::<_, String>(
            r#"
            UPDATE password_reset_tokens
            SET used_at = ?2
            WHERE token_hash = ?1 AND used_at IS NULL AND expires_at > ?2
            RETURNING user_id
            "#,
        )
        .bind(token_hash)
        .bind(now.timestamp())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to consume password reset token");
            StorageError::Database("Failed to consume password reset token".to_string())
        })?;

        Ok(user_id.map(|id| UserId::new(&id)))
    }

    async fn cleanup_expired(&self, before: DateTime<Utc>) -> Result<u64, Error> {
        let result = sqlx::query("DELETE FROM password_reset_tokens WHERE expires_at < ?1")
            .bind(before.timestamp())
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to clean up password reset tokens");
                StorageError::Database("Failed to clean up password reset tokens".to_string())
            })?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrations::{create_test_user, setup_test_db};
    use chrono::Duration;

    #[tokio::test]
    async fn test_consume_once() {
        let pool = setup_test_db().await;
        let user_id = create_test_user(&pool, "alice@example.com").await;
        let repo = SqlitePasswordResetRepository::new(pool);
        let now = Utc::now();

        repo.create_token(&user_id, "digest", now + Duration::hours(1))
            .await
            .unwrap();

        assert_eq!(
            repo.consume_token("digest", now).await.unwrap(),
            Some(user_id)
        );
        assert_eq!(repo.consume_token("digest", now).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_expired_token_is_not_consumed() {
        let pool = setup_test_db().await;
        let user_id = create_test_user(&pool, "alice@example.com").await;
        let repo = SqlitePasswordResetRepository::new(pool);
        let now = Utc::now();

        repo.create_token(&user_id, "digest", now - Duration::minutes(1))
            .await
            .unwrap();

        assert_eq!(repo.consume_token("digest", now).await.unwrap(), None);
        assert_eq!(repo.cleanup_expired(now).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_unknown_digest() {
        let repo = SqlitePasswordResetRepository::new(setup_test_db().await);
        assert_eq!(
            repo.consume_token("missing", Utc::now()).await.unwrap(),
            None
        );
    }
}
