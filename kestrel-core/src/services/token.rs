//! Access and refresh token lifecycle.
//!
//! A login produces a [`TokenPair`]: a signed access token and a stored
//! refresh token. Refreshing mints a new access token and hands back the same
//! refresh token. Refresh tokens are not rotated or invalidated on use, so a
//! leaked one stays usable until it expires or is revoked.

use std::sync::Arc;

use crate::{
    AccessClaims, Error, RefreshToken, RefreshTokenState, TokenConfig, TokenPair, UserId,
    clock::{Clock, SystemClock},
    error::SessionError,
    repositories::RefreshTokenRepository,
};

/// Issues, refreshes and revokes tokens against a [`RefreshTokenRepository`].
pub struct TokenService<R: RefreshTokenRepository> {
    repository: Arc<R>,
    clock: Arc<dyn Clock>,
    config: TokenConfig,
}

impl<R: RefreshTokenRepository> TokenService<R> {
    pub fn new(repository: Arc<R>, config: TokenConfig) -> Self {
        Self::with_clock(repository, config, Arc::new(SystemClock))
    }

    pub fn with_clock(repository: Arc<R>, config: TokenConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            repository,
            clock,
            config,
        }
    }

    pub fn config(&self) -> &TokenConfig {
        &self.config
    }

    /// Store a new refresh token for `user_id` and sign an access token.
    pub async fn issue(&self, user_id: &UserId) -> Result<TokenPair, Error> {
        let now = self.clock.now();
        let token = RefreshToken::issue(user_id.clone(), now, self.config.refresh_token_ttl);
        let refresh_token = self.repository.save(token).await?;

        tracing::debug!(user_id = %user_id, "Issued token pair");
        self.pair_for(refresh_token)
    }

    /// Exchange a refresh token identifier for a fresh access token.
    ///
    /// # Errors
    ///
    /// - [`SessionError::NotFound`] if the identifier is unknown or revoked
    /// - [`SessionError::Expired`] if `now > valid_until`
    pub async fn refresh(&self, identifier: &str) -> Result<TokenPair, Error> {
        let refresh_token = self
            .repository
            .find_by_identifier(identifier)
            .await?
            .ok_or(SessionError::NotFound)?;

        if refresh_token.is_expired_at(self.clock.now()) {
            tracing::debug!(user_id = %refresh_token.user_id, "Refresh token expired");
            return Err(SessionError::Expired.into());
        }

        self.pair_for(refresh_token)
    }

    /// Delete the refresh token with this identifier.
    ///
    /// Revoking an unknown or already revoked identifier succeeds.
    pub async fn revoke(&self, identifier: &str) -> Result<(), Error> {
        if let Some(token) = self.repository.find_by_identifier(identifier).await? {
            self.repository.delete(&token).await?;
            tracing::debug!(user_id = %token.user_id, "Revoked refresh token");
        }
        Ok(())
    }

    /// Delete every refresh token belonging to `user_id`.
    pub async fn revoke_all(&self, user_id: &UserId) -> Result<u64, Error> {
        let count = self.repository.delete_by_user(user_id).await?;
        tracing::info!(user_id = %user_id, count, "Revoked all refresh tokens");
        Ok(count)
    }

    /// Check an access token's signature and issuer, and its expiry against
    /// the service clock.
    pub fn verify_access_token(&self, token: &str) -> Result<AccessClaims, Error> {
        AccessClaims::decode(token, &self.config.jwt, self.clock.now())
    }

    pub async fn state_of(&self, identifier: &str) -> Result<RefreshTokenState, Error> {
        let token = self.repository.find_by_identifier(identifier).await?;
        Ok(RefreshTokenState::of(token.as_ref(), self.clock.now()))
    }

    pub async fn cleanup_expired(&self) -> Result<u64, Error> {
        self.repository.delete_expired(self.clock.now()).await
    }

    /// Periodically delete expired refresh tokens until `shutdown` changes.
    pub fn start_cleanup_task(
        &self,
        interval: std::time::Duration,
        mut shutdown: tokio::sync::watch::Receiver<bool>,
    ) -> tokio::task::JoinHandle<()> {
        let repository = Arc::clone(&self.repository);
        let clock = Arc::clone(&self.clock);

        tokio::spawn(async move {
            let mut interval_timer = tokio::time::interval(interval);

            loop {
                tokio::select! {
                    _ = interval_timer.tick() => {
                        match repository.delete_expired(clock.now()).await {
                            Ok(count) if count > 0 => {
                                tracing::info!(count, "Cleaned up expired refresh tokens");
                            }
                            Err(e) => {
                                tracing::warn!(error = %e, "Failed to clean up expired refresh tokens");
                            }
                            _ => {}
                        }
                    }
                    _ = shutdown.changed() => {
                        tracing::info!("Shutting down refresh token cleanup task");
                        break;
                    }
                }
            }
        })
    }

    fn pair_for(&self, refresh_token: RefreshToken) -> Result<TokenPair, Error> {
        let now = self.clock.now();
        let expires_at = now + self.config.access_token_ttl;
        let access_token =
            AccessClaims::new(&refresh_token.user_id, now, expires_at).encode(&self.config.jwt)?;

        Ok(TokenPair {
            access_token,
            access_token_expires_at: expires_at,
            refresh_token,
        })
    }
}
