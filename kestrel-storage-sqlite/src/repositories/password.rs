use async_trait::async_trait;
use kestrel_core::{Error, UserId, error::StorageError, repositories::PasswordRepository};
use sqlx::SqlitePool;

/// Password hashes live in a nullable column on `users`.
pub struct SqlitePasswordRepository {
    pool: SqlitePool,
}

impl SqlitePasswordRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PasswordRepository for SqlitePasswordRepository {
    async fn set_password_hash(&self, user_id: &UserId, hash: &str) -> Result<(), Error> {
        let result = sqlx::query(
            "UPDATE users SET password_hash = ?1, updated_at = unixepoch() WHERE id = ?2",
        )
        .bind(hash)
        .bind(user_id.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to set password hash");
            StorageError::Database("Failed to set password hash".to_string())
        })?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound.into());
        }

        Ok(())
    }

    async fn get_password_hash(&self, user_id: &UserId) -> Result<Option<String>, Error> {
        let hash = sqlx::query_scalar::<_, Option<String>>(
            "SELECT password_hash FROM users WHERE id = ?1",
        )
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to get password hash");
            StorageError::Database("Failed to get password hash".to_string())
        })?;

        Ok(hash.flatten())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrations::{create_test_user, setup_test_db};

    #[tokio::test]
    async fn test_set_and_get_password_hash() {
        let pool = setup_test_db().await;
        let user_id = create_test_user(&pool, "alice@example.com").await;
        let repo = SqlitePasswordRepository::new(pool);

        assert!(repo.get_password_hash(&user_id).await.unwrap().is_none());

        repo.set_password_hash(&user_id, "$argon2id$hash").await.unwrap();
        assert_eq!(
            repo.get_password_hash(&user_id).await.unwrap().as_deref(),
            Some("$argon2id$hash")
        );
    }

    #[tokio::test]
    async fn test_set_password_for_missing_user() {
        let repo = SqlitePasswordRepository::new(setup_test_db().await);
        let result = repo
            .set_password_hash(&UserId::new_random(), "$argon2id$hash")
            .await;
        assert!(matches!(result, Err(Error::Storage(StorageError::NotFound))));
    }
}
