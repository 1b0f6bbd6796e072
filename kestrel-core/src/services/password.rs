use std::sync::Arc;

use crate::{
    Error, User, UserId,
    error::AuthError,
    repositories::{PasswordRepository, UserRepository},
    services::UserService,
    validation::validate_password,
};

/// Service for password authentication operations
pub struct PasswordService<U: UserRepository, P: PasswordRepository> {
    user_service: Arc<UserService<U>>,
    password_repository: Arc<P>,
}

impl<U: UserRepository, P: PasswordRepository> PasswordService<U, P> {
    pub fn new(user_repository: Arc<U>, password_repository: Arc<P>) -> Self {
        Self {
            user_service: Arc::new(UserService::new(user_repository)),
            password_repository,
        }
    }

    /// Register a new user with a password.
    ///
    /// If the email is already registered the existing user is returned and
    /// the stored password is left untouched.
    pub async fn register_user(
        &self,
        email: &str,
        password: &str,
        name: Option<String>,
    ) -> Result<User, Error> {
        validate_password(password)?;

        if let Some(existing_user) = self.user_service.get_user_by_email(email).await? {
            return Ok(existing_user);
        }

        let password_hash = Self::hash_password(password);
        let user = self.user_service.create_user(email, name).await?;

        self.password_repository
            .set_password_hash(&user.id, &password_hash)
            .await?;

        tracing::info!(user_id = %user.id, "User registered");
        Ok(user)
    }

    /// Check an email and password pair.
    ///
    /// Unknown emails and wrong passwords both yield
    /// [`AuthError::InvalidCredentials`].
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<User, Error> {
        let user = self
            .user_service
            .get_user_by_email(email)
            .await?
            .ok_or(Error::Auth(AuthError::InvalidCredentials))?;

        let password_hash = self
            .password_repository
            .get_password_hash(&user.id)
            .await?
            .ok_or(Error::Auth(AuthError::InvalidCredentials))?;

        if !Self::verify_password(password, &password_hash) {
            return Err(Error::Auth(AuthError::InvalidCredentials));
        }

        Ok(user)
    }

    /// Replace a user's password without checking the old one
    pub async fn set_password(&self, user_id: &UserId, password: &str) -> Result<(), Error> {
        validate_password(password)?;

        let password_hash = Self::hash_password(password);
        self.password_repository
            .set_password_hash(user_id, &password_hash)
            .await
    }

    fn hash_password(password: &str) -> String {
        password_auth::generate_hash(password)
    }

    fn verify_password(password: &str, hash: &str) -> bool {
        password_auth::verify_password(password, hash).is_ok()
    }
}
