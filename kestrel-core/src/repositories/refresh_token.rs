//! Repository trait for refresh tokens.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{Error, RefreshToken, UserId};

/// Persistent store of refresh tokens keyed by their opaque identifier.
///
/// The store never interprets `valid_until`; expired tokens are returned like
/// any other and expiry is decided by the caller.
#[async_trait]
pub trait RefreshTokenRepository: Send + Sync + 'static {
    /// Exact-match lookup by identifier.
    ///
    /// A miss is `Ok(None)`, not an error.
    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<RefreshToken>, Error>;

    /// Insert or update a token, keyed on its identifier.
    ///
    /// A token saved for the first time is assigned an id. Saving an already
    /// stored identifier keeps the id it was first given.
    async fn save(&self, token: RefreshToken) -> Result<RefreshToken, Error>;

    /// Remove a token. Removing a token that is already gone succeeds.
    async fn delete(&self, token: &RefreshToken) -> Result<(), Error>;

    /// Remove every token belonging to a user, returning how many were removed.
    async fn delete_by_user(&self, user_id: &UserId) -> Result<u64, Error>;

    /// Remove tokens whose `valid_until` is before `before`.
    async fn delete_expired(&self, before: DateTime<Utc>) -> Result<u64, Error>;
}
