//! # Kestrel
//!
//! Account security and session handling for the Kestrel project management API.
//! This crate wires the services from `kestrel-core` into one entry point:
//!
//! - Password logins guarded by per-IP, per-identifier throttling
//! - Short-lived JWT access tokens paired with stored refresh tokens
//! - Password reset with the email delivered through a background queue
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use kestrel::{InMemoryQueue, Kestrel, KestrelConfig, SqliteRepositoryProvider};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pool = sqlx::SqlitePool::connect("sqlite::memory:").await?;
//!     let repositories = Arc::new(SqliteRepositoryProvider::new(pool));
//!     let queue = Arc::new(InMemoryQueue::new());
//!
//!     let kestrel = Kestrel::new(repositories, queue, &KestrelConfig::from_env()?);
//!     kestrel.migrate().await?;
//!
//!     let (_user, _tokens) = kestrel
//!         .login("203.0.113.7", "alice@example.com", "correct horse battery")
//!         .await?;
//!     Ok(())
//! }
//! ```
use std::sync::Arc;

use kestrel_core::{
    Clock, SystemClock,
    error::{AuthError, Error as CoreError},
    repositories::{
        LoginAttemptRepositoryAdapter, PasswordRepositoryAdapter, PasswordResetRepositoryAdapter,
        RefreshTokenRepositoryAdapter, UserRepositoryAdapter,
    },
    services::{
        LoginThrottlingService, PasswordResetService, PasswordService, TokenService, UserService,
    },
};

pub mod config;
pub mod worker;

pub use config::KestrelConfig;
pub use worker::EmailWorker;

/// Re-export core types from kestrel_core
pub use kestrel_core::{
    AccessClaims, EmailQueue, InMemoryQueue, JwtConfig, PasswordResetConfig, QueueTransport,
    QueuedMessage, RefreshToken, RefreshTokenState, ThrottlingConfig, TokenConfig, TokenPair,
    User, UserId, repositories::RepositoryProvider,
};

/// Re-export mailer types
pub use kestrel_mailer::{Mailer, MailerConfig};

#[cfg(feature = "sqlite")]
pub use kestrel_storage_sqlite::{SqliteRepositoryProvider, SqliteStorage};

/// Errors returned by [`Kestrel`].
///
/// Messages are flattened to strings; log the source error where it is
/// raised rather than relying on this type to carry it.
#[derive(Debug, thiserror::Error)]
pub enum KestrelError {
    /// Credentials were rejected or an account operation failed
    #[error("Auth error: {0}")]
    AuthError(String),
    /// The login throttling guard refused the attempt
    #[error("Too many failed login attempts")]
    TooManyAttempts,
    #[error("Session error: {0}")]
    SessionError(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Storage error: {0}")]
    StorageError(String),
    #[error("Queue error: {0}")]
    QueueError(String),
    #[error("Mailer error: {0}")]
    MailerError(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<CoreError> for KestrelError {
    fn from(error: CoreError) -> Self {
        match error {
            CoreError::Auth(AuthError::TooManyAttempts) => KestrelError::TooManyAttempts,
            CoreError::Auth(e) => KestrelError::AuthError(e.to_string()),
            CoreError::Crypto(e) => KestrelError::AuthError(e.to_string()),
            CoreError::Session(e) => KestrelError::SessionError(e.to_string()),
            CoreError::Validation(e) => KestrelError::ValidationError(e.to_string()),
            CoreError::Storage(e) => KestrelError::StorageError(e.to_string()),
            CoreError::Queue(e) => KestrelError::QueueError(e.to_string()),
            CoreError::Config(e) => KestrelError::ConfigError(e.to_string()),
        }
    }
}

type Users<R> = UserRepositoryAdapter<R>;
type Passwords<R> = PasswordRepositoryAdapter<R>;

/// The main entry point for account security.
///
/// Generic over the storage backend `R` and the queue transport `Q` that
/// carries outgoing email.
pub struct Kestrel<R: RepositoryProvider, Q: QueueTransport> {
    repositories: Arc<R>,
    user_service: Arc<UserService<Users<R>>>,
    password_service: Arc<PasswordService<Users<R>, Passwords<R>>>,
    throttling_service: Arc<LoginThrottlingService<LoginAttemptRepositoryAdapter<R>>>,
    token_service: Arc<TokenService<RefreshTokenRepositoryAdapter<R>>>,
    password_reset_service:
        Arc<PasswordResetService<Users<R>, Passwords<R>, PasswordResetRepositoryAdapter<R>>>,
    email_queue: Arc<EmailQueue<Q>>,
    password_reset_config: PasswordResetConfig,
}

impl<R: RepositoryProvider, Q: QueueTransport> Kestrel<R, Q> {
    pub fn new(repositories: Arc<R>, queue: Arc<Q>, config: &KestrelConfig) -> Self {
        Self::with_clock(repositories, queue, config, Arc::new(SystemClock))
    }

    /// Build with an explicit time source for every service.
    pub fn with_clock(
        repositories: Arc<R>,
        queue: Arc<Q>,
        config: &KestrelConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let user_repository = Arc::new(UserRepositoryAdapter::new(repositories.clone()));
        let password_repository = Arc::new(PasswordRepositoryAdapter::new(repositories.clone()));
        let login_attempt_repository =
            Arc::new(LoginAttemptRepositoryAdapter::new(repositories.clone()));
        let refresh_token_repository =
            Arc::new(RefreshTokenRepositoryAdapter::new(repositories.clone()));
        let password_reset_repository =
            Arc::new(PasswordResetRepositoryAdapter::new(repositories.clone()));

        let user_service = Arc::new(UserService::new(user_repository.clone()));
        let password_service = Arc::new(PasswordService::new(
            user_repository.clone(),
            password_repository.clone(),
        ));
        let throttling_service = Arc::new(LoginThrottlingService::with_clock(
            login_attempt_repository,
            config.throttling.clone(),
            clock.clone(),
        ));
        let token_service = Arc::new(TokenService::with_clock(
            refresh_token_repository,
            config.tokens.clone(),
            clock.clone(),
        ));
        let password_reset_service = Arc::new(PasswordResetService::with_clock(
            user_repository,
            password_repository,
            password_reset_repository,
            config.password_reset.token_ttl,
            clock,
        ));
        let email_queue = Arc::new(EmailQueue::new(queue, config.mailer.app_name.clone()));

        Self {
            repositories,
            user_service,
            password_service,
            throttling_service,
            token_service,
            password_reset_service,
            email_queue,
            password_reset_config: config.password_reset.clone(),
        }
    }

    pub async fn migrate(&self) -> Result<(), KestrelError> {
        Ok(self.repositories.migrate().await?)
    }

    pub async fn health_check(&self) -> Result<(), KestrelError> {
        Ok(self.repositories.health_check().await?)
    }

    pub fn throttling(&self) -> &LoginThrottlingService<LoginAttemptRepositoryAdapter<R>> {
        &self.throttling_service
    }

    pub fn tokens(&self) -> &TokenService<RefreshTokenRepositoryAdapter<R>> {
        &self.token_service
    }

    /// The email queue, for jobs that are not sent by a [`Kestrel`] method.
    pub fn email_queue(&self) -> &EmailQueue<Q> {
        &self.email_queue
    }

    pub async fn get_user(&self, user_id: &UserId) -> Result<Option<User>, KestrelError> {
        Ok(self.user_service.get_user(user_id).await?)
    }

    /// Register a user with a password.
    ///
    /// Registering an email that already exists returns that user and does
    /// not change their password.
    pub async fn register_user_with_password(
        &self,
        email: &str,
        password: &str,
        name: Option<String>,
    ) -> Result<User, KestrelError> {
        Ok(self
            .password_service
            .register_user(email, password, name)
            .await?)
    }

    /// Log in with email and password from `ip_address`.
    ///
    /// The throttling guard runs before the password is checked. Every
    /// checked attempt is recorded, and a successful login does not clear
    /// earlier failures.
    ///
    /// # Errors
    ///
    /// - [`KestrelError::TooManyAttempts`] if the pair is currently blocked
    /// - [`KestrelError::AuthError`] if the credentials are wrong
    pub async fn login(
        &self,
        ip_address: &str,
        email: &str,
        password: &str,
    ) -> Result<(User, TokenPair), KestrelError> {
        if self
            .throttling_service
            .is_login_blocked(ip_address, email)
            .await?
        {
            return Err(KestrelError::TooManyAttempts);
        }

        let user = match self.password_service.authenticate(email, password).await {
            Ok(user) => user,
            Err(e) => {
                if e.is_auth_error() {
                    self.throttling_service
                        .record_attempt(ip_address, email, false)
                        .await?;
                }
                return Err(e.into());
            }
        };

        self.throttling_service
            .record_attempt(ip_address, email, true)
            .await?;

        let tokens = self.token_service.issue(&user.id).await?;
        tracing::info!(user_id = %user.id, "User logged in");

        Ok((user, tokens))
    }

    /// Mint a new access token from a refresh token identifier.
    ///
    /// The refresh token in the returned pair is the one presented.
    pub async fn refresh(&self, identifier: &str) -> Result<TokenPair, KestrelError> {
        Ok(self.token_service.refresh(identifier).await?)
    }

    /// Revoke one refresh token. Unknown identifiers are ignored.
    pub async fn logout(&self, identifier: &str) -> Result<(), KestrelError> {
        Ok(self.token_service.revoke(identifier).await?)
    }

    /// Revoke every refresh token held by `user_id`.
    pub async fn logout_everywhere(&self, user_id: &UserId) -> Result<u64, KestrelError> {
        Ok(self.token_service.revoke_all(user_id).await?)
    }

    pub fn verify_access_token(&self, token: &str) -> Result<AccessClaims, KestrelError> {
        Ok(self.token_service.verify_access_token(token)?)
    }

    /// Start a password reset for `email`.
    ///
    /// When the account exists a reset email is queued. The result is the
    /// same whether or not it does.
    pub async fn request_password_reset(&self, email: &str) -> Result<(), KestrelError> {
        let Some((user, token)) = self
            .password_reset_service
            .request_password_reset(email)
            .await?
        else {
            return Ok(());
        };

        let finish_url = self.password_reset_config.finish_url_for(&token);
        self.email_queue
            .password_reset_email(&user.email, &finish_url)
            .await
            .map_err(|e| KestrelError::QueueError(e.to_string()))?;

        Ok(())
    }

    /// Finish a password reset and sign the user out of every session.
    pub async fn reset_password(
        &self,
        token: &str,
        new_password: &str,
    ) -> Result<User, KestrelError> {
        let user = self
            .password_reset_service
            .reset_password(token, new_password)
            .await?;

        self.token_service.revoke_all(&user.id).await?;
        Ok(user)
    }

    /// Delete expired refresh tokens and password reset tokens.
    ///
    /// Returns how many rows were removed in total.
    pub async fn cleanup_expired(&self) -> Result<u64, KestrelError> {
        let tokens = self.token_service.cleanup_expired().await?;
        let resets = self.password_reset_service.cleanup_expired().await?;
        tracing::info!(tokens, resets, "Removed expired tokens");
        Ok(tokens + resets)
    }

    /// Run refresh token cleanup every `interval` until `shutdown` changes.
    pub fn start_cleanup_task(
        &self,
        interval: std::time::Duration,
        shutdown: tokio::sync::watch::Receiver<bool>,
    ) -> tokio::task::JoinHandle<()> {
        self.token_service.start_cleanup_task(interval, shutdown)
    }
}
