//! SQLite implementation of the refresh token store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kestrel_core::{
    Error, RefreshToken, RefreshTokenId, UserId, error::StorageError,
    repositories::RefreshTokenRepository,
};
use sqlx::SqlitePool;

pub struct SqliteRefreshTokenRepository {
    pool: SqlitePool,
}

impl SqliteRefreshTokenRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SqliteRefreshToken {
    id: String,
    identifier: String,
    user_id: String,
    valid_until: i64,
}

impl TryFrom<SqliteRefreshToken> for RefreshToken {
    type Error = Error;

    fn try_from(row: SqliteRefreshToken) -> Result<Self, Self::Error> {
        let valid_until = DateTime::from_timestamp(row.valid_until, 0).ok_or_else(|| {
            StorageError::Database(format!("Invalid valid_until: {}", row.valid_until))
        })?;

        Ok(RefreshToken {
            id: Some(RefreshTokenId::new(&row.id)),
            identifier: row.identifier,
            valid_until,
            user_id: UserId::new(&row.user_id),
        })
    }
}

#[async_trait]
impl RefreshTokenRepository for SqliteRefreshTokenRepository {
    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<RefreshToken>, Error> {
        let row = sqlx::query_as::<_, SqliteRefreshToken>(
            "SELECT id, identifier, user_id, valid_until FROM refresh_tokens WHERE identifier = ?1",
        )
        .bind(identifier)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to find refresh token");
            StorageError::Database("Failed to find refresh token".to_string())
        })?;

        row.map(TryInto::try_into).transpose()
    }

    async fn save(&self, token: RefreshToken) -> Result<RefreshToken, Error> {
        let id = token.id.unwrap_or_else(RefreshTokenId::new_random);

        // An existing row keeps its id and owner; only the expiry moves
        let row = sqlx::query_as::<_, SqliteRefreshToken>(
            r#"
            INSERT INTO refresh_tokens (id, identifier, user_id, valid_until)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(identifier) DO UPDATE SET
                valid_until = excluded.valid_until
            WHERE refresh_tokens.user_id = excluded.user_id
            RETURNING id, identifier, user_id, valid_until
            "#,
        )
        .bind(id.as_str())
        .bind(&token.identifier)
        .bind(token.user_id.as_str())
        .bind(token.valid_until.timestamp())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to save refresh token");
            StorageError::Database("Failed to save refresh token".to_string())
        })?;

        let Some(row) = row else {
            tracing::warn!(
                user_id = %token.user_id,
                "Refresh token identifier already belongs to another user"
            );
            return Err(StorageError::Constraint(
                "refresh token belongs to another user".to_string(),
            )
            .into());
        };

        row.try_into()
    }

    async fn delete(&self, token: &RefreshToken) -> Result<(), Error> {
        sqlx::query("DELETE FROM refresh_tokens WHERE identifier = ?1")
            .bind(&token.identifier)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to delete refresh token");
                StorageError::Database("Failed to delete refresh token".to_string())
            })?;

        Ok(())
    }

    async fn delete_by_user(&self, user_id: &UserId) -> Result<u64, Error> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE user_id = ?1")
            .bind(user_id.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to delete user refresh tokens");
                StorageError::Database("Failed to delete user refresh tokens".to_string())
            })?;

        Ok(result.rows_affected())
    }

    async fn delete_expired(&self, before: DateTime<Utc>) -> Result<u64, Error> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE valid_until < ?1")
            .bind(before.timestamp())
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to delete expired refresh tokens");
                StorageError::Database("Failed to delete expired refresh tokens".to_string())
            })?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrations::{create_test_user, setup_test_db};
    use chrono::Duration;

    async fn setup() -> (SqliteRefreshTokenRepository, UserId) {
        let pool = setup_test_db().await;
        let user_id = create_test_user(&pool, "alice@example.com").await;
        (SqliteRefreshTokenRepository::new(pool), user_id)
    }

    #[tokio::test]
    async fn test_save_then_find() {
        let (repo, user_id) = setup().await;
        let token = RefreshToken::issue(user_id.clone(), Utc::now(), Duration::days(30));

        let saved = repo.save(token.clone()).await.unwrap();
        assert!(saved.id.as_ref().is_some_and(|id| id.is_valid()));

        let found = repo
            .find_by_identifier(&token.identifier)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.identifier, token.identifier);
        assert_eq!(found.valid_until, token.valid_until);
        assert_eq!(found.user_id, user_id);
        assert_eq!(found.id, saved.id);
    }

    #[tokio::test]
    async fn test_unknown_identifier_is_none() {
        let (repo, _) = setup().await;
        assert!(repo.find_by_identifier("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_find_does_not_filter_expired() {
        let (repo, user_id) = setup().await;
        let token = RefreshToken::issue(user_id, Utc::now() - Duration::days(31), Duration::days(30));
        repo.save(token.clone()).await.unwrap();

        let found = repo.find_by_identifier(&token.identifier).await.unwrap();
        assert!(found.is_some_and(|t| t.is_expired_at(Utc::now())));
    }

    #[tokio::test]
    async fn test_save_is_upsert_keeping_id() {
        let (repo, user_id) = setup().await;
        let token = RefreshToken::issue(user_id, Utc::now(), Duration::days(30));

        let first = repo.save(token.clone()).await.unwrap();

        let mut extended = token.clone();
        extended.valid_until = token.valid_until + Duration::days(1);
        let second = repo.save(extended.clone()).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.valid_until, extended.valid_until);

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM refresh_tokens")
            .fetch_one(&repo.pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_save_does_not_change_owner() {
        let (repo, alice) = setup().await;
        let bob = create_test_user(&repo.pool, "bob@example.com").await;
        let token = RefreshToken::issue(alice.clone(), Utc::now(), Duration::days(30));
        repo.save(token.clone()).await.unwrap();

        let mut stolen = token.clone();
        stolen.user_id = bob;
        stolen.valid_until = token.valid_until + Duration::days(1);

        let result = repo.save(stolen).await;
        assert!(matches!(
            result,
            Err(Error::Storage(StorageError::Constraint(_)))
        ));

        let found = repo
            .find_by_identifier(&token.identifier)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.user_id, alice);
        assert_eq!(found.valid_until, token.valid_until);
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let (repo, user_id) = setup().await;
        let token = repo
            .save(RefreshToken::issue(user_id, Utc::now(), Duration::days(30)))
            .await
            .unwrap();

        repo.delete(&token).await.unwrap();
        repo.delete(&token).await.unwrap();

        assert!(
            repo.find_by_identifier(&token.identifier)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_delete_expired_and_by_user() {
        let (repo, user_id) = setup().await;
        let now = Utc::now();

        repo.save(RefreshToken::issue(user_id.clone(), now - Duration::days(40), Duration::days(30)))
            .await
            .unwrap();
        repo.save(RefreshToken::issue(user_id.clone(), now, Duration::days(30)))
            .await
            .unwrap();
        repo.save(RefreshToken::issue(user_id.clone(), now, Duration::days(30)))
            .await
            .unwrap();

        assert_eq!(repo.delete_expired(now).await.unwrap(), 1);
        assert_eq!(repo.delete_by_user(&user_id).await.unwrap(), 2);
    }
}
