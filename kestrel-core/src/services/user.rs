use std::sync::Arc;

use crate::{Error, NewUser, User, UserId, repositories::UserRepository, validation::validate_email};

/// Service for user management operations
pub struct UserService<R: UserRepository> {
    repository: Arc<R>,
}

impl<R: UserRepository> UserService<R> {
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    /// Create a new user after validating the email format
    pub async fn create_user(&self, email: &str, name: Option<String>) -> Result<User, Error> {
        validate_email(email)?;

        let new_user = NewUser::new(email).with_name(name);
        self.repository.create(new_user).await
    }

    pub async fn get_user(&self, user_id: &UserId) -> Result<Option<User>, Error> {
        self.repository.find_by_id(user_id).await
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, Error> {
        self.repository.find_by_email(email).await
    }
}
