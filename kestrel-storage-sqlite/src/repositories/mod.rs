//! Repository implementations for SQLite storage

pub mod login_attempt;
pub mod password;
pub mod password_reset;
pub mod refresh_token;
pub mod user;

pub use login_attempt::SqliteLoginAttemptRepository;
pub use password::SqlitePasswordRepository;
pub use password_reset::SqlitePasswordResetRepository;
pub use refresh_token::SqliteRefreshTokenRepository;
pub use user::SqliteUserRepository;

use async_trait::async_trait;
use kestrel_core::{
    Error,
    error::StorageError,
    repositories::{
        LoginAttemptRepositoryProvider, PasswordRepositoryProvider,
        PasswordResetRepositoryProvider, RefreshTokenRepositoryProvider, RepositoryProvider,
        UserRepositoryProvider,
    },
};
use kestrel_migration::MigrationManager;
use sqlx::SqlitePool;

use crate::migrations::{self, SqliteMigrationManager};

/// Every SQLite repository over one shared pool.
pub struct SqliteRepositoryProvider {
    pool: SqlitePool,
    user: SqliteUserRepository,
    password: SqlitePasswordRepository,
    login_attempt: SqliteLoginAttemptRepository,
    refresh_token: SqliteRefreshTokenRepository,
    password_reset: SqlitePasswordResetRepository,
}

impl SqliteRepositoryProvider {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            user: SqliteUserRepository::new(pool.clone()),
            password: SqlitePasswordRepository::new(pool.clone()),
            login_attempt: SqliteLoginAttemptRepository::new(pool.clone()),
            refresh_token: SqliteRefreshTokenRepository::new(pool.clone()),
            password_reset: SqlitePasswordResetRepository::new(pool.clone()),
            pool,
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl UserRepositoryProvider for SqliteRepositoryProvider {
    type UserRepo = SqliteUserRepository;

    fn user(&self) -> &Self::UserRepo {
        &self.user
    }
}

impl PasswordRepositoryProvider for SqliteRepositoryProvider {
    type PasswordRepo = SqlitePasswordRepository;

    fn password(&self) -> &Self::PasswordRepo {
        &self.password
    }
}

impl LoginAttemptRepositoryProvider for SqliteRepositoryProvider {
    type LoginAttemptRepo = SqliteLoginAttemptRepository;

    fn login_attempt(&self) -> &Self::LoginAttemptRepo {
        &self.login_attempt
    }
}

impl RefreshTokenRepositoryProvider for SqliteRepositoryProvider {
    type RefreshTokenRepo = SqliteRefreshTokenRepository;

    fn refresh_token(&self) -> &Self::RefreshTokenRepo {
        &self.refresh_token
    }
}

impl PasswordResetRepositoryProvider for SqliteRepositoryProvider {
    type PasswordResetRepo = SqlitePasswordResetRepository;

    fn password_reset(&self) -> &Self::PasswordResetRepo {
        &self.password_reset
    }
}

#[async_trait]
impl RepositoryProvider for SqliteRepositoryProvider {
    async fn migrate(&self) -> Result<(), Error> {
        let manager = SqliteMigrationManager::new(self.pool.clone());
        manager.initialize().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to initialize migrations");
            StorageError::Migration("Failed to initialize migrations".to_string())
        })?;

        manager.up(&migrations::all()).await.map_err(|e| {
            tracing::error!(error = %e, "Failed to run migrations");
            StorageError::Migration("Failed to run migrations".to_string())
        })?;

        Ok(())
    }

    async fn health_check(&self) -> Result<(), Error> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "SQLite health check failed");
                StorageError::Connection("SQLite health check failed".to_string())
            })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use kestrel_core::{
        LoginAttempt, NewUser, RefreshToken,
        repositories::{LoginAttemptRepository, RefreshTokenRepository, UserRepository},
    };

    #[tokio::test]
    async fn test_provider_migrate_and_use() {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        let provider = SqliteRepositoryProvider::new(pool);

        provider.migrate().await.unwrap();
        provider.migrate().await.unwrap();
        provider.health_check().await.unwrap();

        let user = provider
            .user()
            .create(NewUser::new("alice@example.com"))
            .await
            .unwrap();
        let token = provider
            .refresh_token()
            .save(RefreshToken::issue(user.id.clone(), Utc::now(), Duration::days(30)))
            .await
            .unwrap();
        provider
            .login_attempt()
            .record(&LoginAttempt::failed("203.0.113.7", "alice@example.com", Utc::now()))
            .await
            .unwrap();

        assert!(
            provider
                .refresh_token()
                .find_by_identifier(&token.identifier)
                .await
                .unwrap()
                .is_some()
        );
    }
}
