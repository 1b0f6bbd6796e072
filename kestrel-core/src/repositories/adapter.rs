use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    Error, LoginAttempt, NewUser, RefreshToken, User, UserId,
    repositories::{
        LoginAttemptRepository, PasswordRepository, PasswordResetRepository,
        RefreshTokenRepository, RepositoryProvider, UserRepository,
    },
};

/// Adapter that wraps a RepositoryProvider and implements individual repository traits
pub struct UserRepositoryAdapter<R: RepositoryProvider> {
    provider: Arc<R>,
}

impl<R: RepositoryProvider> UserRepositoryAdapter<R> {
    pub fn new(provider: Arc<R>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl<R: RepositoryProvider> UserRepository for UserRepositoryAdapter<R> {
    async fn create(&self, user: NewUser) -> Result<User, Error> {
        self.provider.user().create(user).await
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, Error> {
        self.provider.user().find_by_id(id).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, Error> {
        self.provider.user().find_by_email(email).await
    }
}

pub struct PasswordRepositoryAdapter<R: RepositoryProvider> {
    provider: Arc<R>,
}

impl<R: RepositoryProvider> PasswordRepositoryAdapter<R> {
    pub fn new(provider: Arc<R>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl<R: RepositoryProvider> PasswordRepository for PasswordRepositoryAdapter<R> {
    async fn set_password_hash(&self, user_id: &UserId, hash: &str) -> Result<(), Error> {
        self.provider
            .password()
            .set_password_hash(user_id, hash)
            .await
    }

    async fn get_password_hash(&self, user_id: &UserId) -> Result<Option<String>, Error> {
        self.provider.password().get_password_hash(user_id).await
    }
}

pub struct LoginAttemptRepositoryAdapter<R: RepositoryProvider> {
    provider: Arc<R>,
}

impl<R: RepositoryProvider> LoginAttemptRepositoryAdapter<R> {
    pub fn new(provider: Arc<R>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl<R: RepositoryProvider> LoginAttemptRepository for LoginAttemptRepositoryAdapter<R> {
    async fn record(&self, attempt: &LoginAttempt) -> Result<(), Error> {
        self.provider.login_attempt().record(attempt).await
    }

    async fn find_since(
        &self,
        ip_address: &str,
        identifier: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<LoginAttempt>, Error> {
        self.provider
            .login_attempt()
            .find_since(ip_address, identifier, since)
            .await
    }
}

pub struct RefreshTokenRepositoryAdapter<R: RepositoryProvider> {
    provider: Arc<R>,
}

impl<R: RepositoryProvider> RefreshTokenRepositoryAdapter<R> {
    pub fn new(provider: Arc<R>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl<R: RepositoryProvider> RefreshTokenRepository for RefreshTokenRepositoryAdapter<R> {
    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<RefreshToken>, Error> {
        self.provider
            .refresh_token()
            .find_by_identifier(identifier)
            .await
    }

    async fn save(&self, token: RefreshToken) -> Result<RefreshToken, Error> {
        self.provider.refresh_token().save(token).await
    }

    async fn delete(&self, token: &RefreshToken) -> Result<(), Error> {
        self.provider.refresh_token().delete(token).await
    }

    async fn delete_by_user(&self, user_id: &UserId) -> Result<u64, Error> {
        self.provider.refresh_token().delete_by_user(user_id).await
    }

    async fn delete_expired(&self, before: DateTime<Utc>) -> Result<u64, Error> {
        self.provider.refresh_token().delete_expired(before).await
    }
}

pub struct PasswordResetRepositoryAdapter<R: RepositoryProvider> {
    provider: Arc<R>,
}

impl<R: RepositoryProvider> PasswordResetRepositoryAdapter<R> {
    pub fn new(provider: Arc<R>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl<R: RepositoryProvider> PasswordResetRepository for PasswordResetRepositoryAdapter<R> {
    async fn create_token(
        &self,
        user_id: &UserId,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), Error> {
        self.provider
            .password_reset()
            .create_token(user_id, token_hash, expires_at)
            .await
    }

    async fn consume_token(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<UserId>, Error> {
        self.provider
            .password_reset()
            .consume_token(token_hash, now)
            .await
    }

    async fn cleanup_expired(&self, before: DateTime<Utc>) -> Result<u64, Error> {
        self.provider
            .password_reset()
            .cleanup_expired(before)
            .await
    }
}
