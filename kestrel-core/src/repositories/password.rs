use async_trait::async_trait;

use crate::{Error, UserId};

/// Repository for password hashes, kept apart from the user record
#[async_trait]
pub trait PasswordRepository: Send + Sync + 'static {
    /// Store or replace the password hash for a user
    async fn set_password_hash(&self, user_id: &UserId, hash: &str) -> Result<(), Error>;

    /// Get the password hash for a user, if one is set
    async fn get_password_hash(&self, user_id: &UserId) -> Result<Option<String>, Error>;
}
