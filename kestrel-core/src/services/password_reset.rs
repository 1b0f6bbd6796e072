use std::sync::Arc;

use chrono::Duration;

use crate::{
    Error, User,
    clock::{Clock, SystemClock},
    crypto::{generate_secure_token, hash_token},
    error::AuthError,
    repositories::{PasswordRepository, PasswordResetRepository, UserRepository},
    services::{PasswordService, UserService},
    validation::validate_password,
};

/// Service for password reset operations
pub struct PasswordResetService<U: UserRepository, P: PasswordRepository, T: PasswordResetRepository>
{
    user_service: Arc<UserService<U>>,
    password_service: Arc<PasswordService<U, P>>,
    reset_repository: Arc<T>,
    clock: Arc<dyn Clock>,
    token_ttl: Duration,
}

impl<U: UserRepository, P: PasswordRepository, T: PasswordResetRepository>
    PasswordResetService<U, P, T>
{
    pub fn new(
        user_repository: Arc<U>,
        password_repository: Arc<P>,
        reset_repository: Arc<T>,
        token_ttl: Duration,
    ) -> Self {
        Self::with_clock(
            user_repository,
            password_repository,
            reset_repository,
            token_ttl,
            Arc::new(SystemClock),
        )
    }

    pub fn with_clock(
        user_repository: Arc<U>,
        password_repository: Arc<P>,
        reset_repository: Arc<T>,
        token_ttl: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let user_service = Arc::new(UserService::new(user_repository.clone()));
        let password_service = Arc::new(PasswordService::new(user_repository, password_repository));

        Self {
            user_service,
            password_service,
            reset_repository,
            clock,
            token_ttl,
        }
    }

    /// Create a reset token for the account registered under `email`.
    ///
    /// Returns the user and the plaintext token, or `None` when no account
    /// exists. Callers should respond identically in both cases.
    pub async fn request_password_reset(
        &self,
        email: &str,
    ) -> Result<Option<(User, String)>, Error> {
        let Some(user) = self.user_service.get_user_by_email(email).await? else {
            tracing::debug!("Password reset requested for unknown email");
            return Ok(None);
        };

        let token = generate_secure_token();
        let expires_at = self.clock.now() + self.token_ttl;
        self.reset_repository
            .create_token(&user.id, &hash_token(&token), expires_at)
            .await?;

        tracing::info!(user_id = %user.id, "Password reset token created");
        Ok(Some((user, token)))
    }

    /// Consume a reset token and set a new password.
    ///
    /// The new password is validated before the token is consumed, so a
    /// rejected password leaves the token usable.
    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<User, Error> {
        validate_password(new_password)?;

        let user_id = self
            .reset_repository
            .consume_token(&hash_token(token), self.clock.now())
            .await?
            .ok_or(AuthError::InvalidResetToken)?;

        let user = self
            .user_service
            .get_user(&user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        self.password_service
            .set_password(&user.id, new_password)
            .await?;

        tracing::info!(user_id = %user.id, "Password reset completed");
        Ok(user)
    }

    pub async fn cleanup_expired(&self) -> Result<u64, Error> {
        self.reset_repository
            .cleanup_expired(self.clock.now())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::error::ValidationError;
    use crate::{NewUser, UserId};
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use std::collections::HashMap;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct MockUserRepository {
        users: Mutex<HashMap<UserId, User>>,
    }

    #[async_trait]
    impl UserRepository for MockUserRepository {
        async fn create(&self, new_user: NewUser) -> Result<User, Error> {
            let user = User {
                id: new_user.id,
                email: new_user.email,
                name: new_user.name,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            };
            self.users
                .lock()
                .await
                .insert(user.id.clone(), user.clone());
            Ok(user)
        }

        async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, Error> {
            Ok(self.users.lock().await.get(id).cloned())
        }

        async fn find_by_email(&self, email: &str) -> Result<Option<User>, Error> {
            Ok(self
                .users
                .lock()
                .await
                .values()
                .find(|u| u.email == email)
                .cloned())
        }
    }

    #[derive(Default)]
    struct MockPasswordRepository {
        hashes: Mutex<HashMap<UserId, String>>,
    }

    #[async_trait]
    impl PasswordRepository for MockPasswordRepository {
        async fn set_password_hash(&self, user_id: &UserId, hash: &str) -> Result<(), Error> {
            self.hashes
                .lock()
                .await
                .insert(user_id.clone(), hash.to_string());
            Ok(())
        }

        async fn get_password_hash(&self, user_id: &UserId) -> Result<Option<String>, Error> {
            Ok(self.hashes.lock().await.get(user_id).cloned())
        }
    }

    struct StoredToken {
        user_id: UserId,
        expires_at: DateTime<Utc>,
        used: bool,
    }

    #[derive(Default)]
    struct MockPasswordResetRepository {
        tokens: Mutex<HashMap<String, StoredToken>>,
    }

    #[async_trait]
    impl PasswordResetRepository for MockPasswordResetRepository {
        async fn create_token(
            &self,
            user_id: &UserId,
            token_hash: &str,
            expires_at: DateTime<Utc>,
        ) -> Result<(), Error> {
            self.tokens.lock().await.insert(
                token_hash.to_string(),
                StoredToken {
                    user_id: user_id.clone(),
                    expires_at,
                    used: false,
                },
            );
            Ok(())
        }

        async fn consume_token(
            &self,
            token_hash: &str,
            now: DateTime<Utc>,
        ) -> Result<Option<UserId>, Error> {
            let mut tokens = self.tokens.lock().await;
            match tokens.get_mut(token_hash) {
                Some(token) if !token.used && token.expires_at > now => {
                    token.used = true;
                    Ok(Some(token.user_id.clone()))
                }
                _ => Ok(None),
            }
        }

        async fn cleanup_expired(&self, before: DateTime<Utc>) -> Result<u64, Error> {
            let mut tokens = self.tokens.lock().await;
            let count = tokens.len();
            tokens.retain(|_, t| t.expires_at >= before);
            Ok((count - tokens.len()) as u64)
        }
    }

    type Service =
        PasswordResetService<MockUserRepository, MockPasswordRepository, MockPasswordResetRepository>;

    async fn setup() -> (
        Service,
        PasswordService<MockUserRepository, MockPasswordRepository>,
        Arc<MockPasswordResetRepository>,
        Arc<FixedClock>,
    ) {
        let users = Arc::new(MockUserRepository::default());
        let passwords = Arc::new(MockPasswordRepository::default());
        let resets = Arc::new(MockPasswordResetRepository::default());
        let clock = Arc::new(FixedClock::new(Utc::now()));

        let password_service = PasswordService::new(users.clone(), passwords.clone());
        password_service
            .register_user("alice@example.com", "correct horse", None)
            .await
            .unwrap();

        let service = PasswordResetService::with_clock(
            users,
            passwords,
            resets.clone(),
            Duration::hours(1),
            clock.clone(),
        );
        (service, password_service, resets, clock)
    }

    #[tokio::test]
    async fn test_unknown_email_returns_none() {
        let (service, _, resets, _) = setup().await;
        let result = service
            .request_password_reset("nobody@example.com")
            .await
            .unwrap();

        assert!(result.is_none());
        assert!(resets.tokens.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_token_is_stored_hashed() {
        let (service, _, resets, _) = setup().await;
        let (_, token) = service
            .request_password_reset("alice@example.com")
            .await
            .unwrap()
            .unwrap();

        let tokens = resets.tokens.lock().await;
        assert!(!tokens.contains_key(&token));
        assert!(tokens.contains_key(&hash_token(&token)));
    }

    #[tokio::test]
    async fn test_reset_password_flow() {
        let (service, passwords, _, _) = setup().await;
        let (user, token) = service
            .request_password_reset("alice@example.com")
            .await
            .unwrap()
            .unwrap();

        let reset_user = service
            .reset_password(&token, "battery staple")
            .await
            .unwrap();
        assert_eq!(reset_user.id, user.id);

        assert!(
            passwords
                .authenticate("alice@example.com", "battery staple")
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn test_token_is_single_use() {
        let (service, _, _, _) = setup().await;
        let (_, token) = service
            .request_password_reset("alice@example.com")
            .await
            .unwrap()
            .unwrap();

        service
            .reset_password(&token, "battery staple")
            .await
            .unwrap();
        let second = service.reset_password(&token, "another password").await;

        assert!(matches!(
            second,
            Err(Error::Auth(AuthError::InvalidResetToken))
        ));
    }

    #[tokio::test]
    async fn test_expired_token_is_rejected() {
        let (service, _, _, clock) = setup().await;
        let (_, token) = service
            .request_password_reset("alice@example.com")
            .await
            .unwrap()
            .unwrap();

        clock.advance(Duration::hours(2));
        let result = service.reset_password(&token, "battery staple").await;

        assert!(matches!(
            result,
            Err(Error::Auth(AuthError::InvalidResetToken))
        ));
        assert_eq!(service.cleanup_expired().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_weak_password_keeps_token() {
        let (service, _, _, _) = setup().await;
        let (_, token) = service
            .request_password_reset("alice@example.com")
            .await
            .unwrap()
            .unwrap();

        let weak = service.reset_password(&token, "short").await;
        assert!(matches!(
            weak,
            Err(Error::Validation(ValidationError::InvalidPassword(_)))
        ));

        assert!(service.reset_password(&token, "battery staple").await.is_ok());
    }
}
