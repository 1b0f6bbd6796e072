//! Refresh tokens
//!
//! A refresh token is a long-lived opaque credential exchanged for new access
//! tokens. The lifecycle is:
//!
//! ```text
//! Issued --(used to refresh)--> Issued      (no single-use invalidation)
//! Issued --(now > valid_until)--> Expired
//! Issued --(logout)--> Revoked
//! ```
//!
//! Using a token to refresh does not invalidate it. Anyone holding a leaked
//! refresh token can keep minting access tokens until it expires or the user
//! logs out with it. Expiry is checked by the token service, not the store.

use std::str::FromStr;

use chrono::{DateTime, Duration, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    Error, UserId,
    crypto::generate_secure_token,
    error::ValidationError,
    id::{generate_prefixed_id, validate_prefixed_id},
};

/// Persistence identity of a stored refresh token (`rtk_...`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RefreshTokenId(String);

impl RefreshTokenId {
    pub fn new(id: &str) -> Self {
        RefreshTokenId(id.to_string())
    }

    pub fn new_random() -> Self {
        RefreshTokenId(generate_prefixed_id("rtk"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }

    pub fn is_valid(&self) -> bool {
        validate_prefixed_id(&self.0, "rtk")
    }
}

impl std::fmt::Display for RefreshTokenId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RefreshTokenId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id = RefreshTokenId::new(s);
        if id.is_valid() {
            Ok(id)
        } else {
            Err(ValidationError::InvalidField(format!(
                "Invalid refresh token ID format: expected 'rtk_' prefix, got '{s}'"
            ))
            .into())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshToken {
    /// Assigned by the store on first save
    pub id: Option<RefreshTokenId>,
    /// Opaque value handed to the client; unique across all tokens
    pub identifier: String,
    pub valid_until: DateTime<Utc>,
    /// The owning user. The token does not own the user's lifecycle.
    pub user_id: UserId,
}

impl RefreshToken {
    /// Mint an unsaved token for `user_id` expiring `ttl` after `now`.
    ///
    /// `valid_until` is truncated to whole seconds, the resolution stores keep.
    pub fn issue(user_id: UserId, now: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            id: None,
            identifier: generate_secure_token(),
            valid_until: (now + ttl).trunc_subsecs(0),
            user_id,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.valid_until
    }

    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }
}

/// Observable lifecycle state of a refresh token identifier.
///
/// A consumed token is indistinguishable from a freshly issued one, so there
/// is no separate consumed state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RefreshTokenState {
    Issued,
    Expired,
    /// Deleted at logout, or never issued
    Revoked,
}

impl RefreshTokenState {
    pub fn of(token: Option<&RefreshToken>, now: DateTime<Utc>) -> Self {
        match token {
            None => RefreshTokenState::Revoked,
            Some(token) if token.is_expired_at(now) => RefreshTokenState::Expired,
            Some(_) => RefreshTokenState::Issued,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, RefreshTokenState::Issued)
    }
}

/// An access token together with the refresh token that can renew it.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub access_token_expires_at: DateTime<Utc>,
    pub refresh_token: RefreshToken,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_truncates_to_seconds() {
        let now = Utc::now();
        let token = RefreshToken::issue(UserId::new_random(), now, Duration::days(30));

        assert!(token.id.is_none());
        assert_eq!(token.valid_until.timestamp_subsec_nanos(), 0);
        assert!(token.valid_until > now);
        assert_eq!(token.identifier.len(), 43);
    }

    #[test]
    fn test_expiry_boundary() {
        let now = Utc::now().trunc_subsecs(0);
        let token = RefreshToken::issue(UserId::new_random(), now, Duration::minutes(5));

        assert!(!token.is_expired_at(token.valid_until));
        assert!(token.is_expired_at(token.valid_until + Duration::seconds(1)));
    }

    #[test]
    fn test_state_of() {
        let now = Utc::now();
        let token = RefreshToken::issue(UserId::new_random(), now, Duration::minutes(5));

        assert_eq!(RefreshTokenState::of(Some(&token), now), RefreshTokenState::Issued);
        assert_eq!(
            RefreshTokenState::of(Some(&token), now + Duration::minutes(10)),
            RefreshTokenState::Expired
        );
        assert_eq!(RefreshTokenState::of(None, now), RefreshTokenState::Revoked);
        assert!(RefreshTokenState::Revoked.is_terminal());
        assert!(!RefreshTokenState::Issued.is_terminal());
    }

    #[test]
    fn test_refresh_token_id_parse() {
        let id = RefreshTokenId::new_random();
        assert_eq!(id.as_str().parse::<RefreshTokenId>().unwrap(), id);
        assert!("usr_abc".parse::<RefreshTokenId>().is_err());
    }
}
