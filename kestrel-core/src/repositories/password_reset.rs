//! Repository trait for password reset tokens.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{Error, UserId};

/// Store of single-use password reset tokens.
///
/// Only SHA-256 digests of tokens are ever passed in; the plaintext token
/// exists only in the email sent to the user.
#[async_trait]
pub trait PasswordResetRepository: Send + Sync + 'static {
    /// Store a new reset token digest for a user.
    async fn create_token(
        &self,
        user_id: &UserId,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), Error>;

    /// Mark a token as used and return its owner.
    ///
    /// Returns `None` when the digest is unknown, already used, or expired at
    /// `now`. A token can be consumed at most once.
    async fn consume_token(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<UserId>, Error>;

    /// Remove tokens that expired before `before`.
    async fn cleanup_expired(&self, before: DateTime<Utc>) -> Result<u64, Error>;
}
