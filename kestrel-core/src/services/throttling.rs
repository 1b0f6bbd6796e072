//! Login throttling guard.
//!
//! Before a credential check, callers ask whether the `(ip_address,
//! identifier)` pair has failed too often within the trailing window. The
//! guard only counts; it never records, resets or locks anything itself.
//!
//! # Example
//!
//! ```rust,ignore
//! use kestrel_core::services::LoginThrottlingService;
//! use kestrel_core::ThrottlingConfig;
//!
//! let throttling = LoginThrottlingService::new(repository, ThrottlingConfig::from_env()?);
//!
//! if throttling.is_login_blocked("203.0.113.7", "alice@example.com").await? {
//!     return Err(AuthError::TooManyAttempts.into());
//! }
//! ```

use std::sync::Arc;

use crate::{
    Error, LoginAttempt, ThrottlingConfig,
    clock::{Clock, SystemClock},
    repositories::LoginAttemptRepository,
};

/// Decides whether a login should be refused based on recent failures.
///
/// Successful attempts inside the window do not offset failures; only the
/// passage of time unblocks a pair.
pub struct LoginThrottlingService<R: LoginAttemptRepository> {
    repository: Arc<R>,
    clock: Arc<dyn Clock>,
    config: ThrottlingConfig,
}

impl<R: LoginAttemptRepository> LoginThrottlingService<R> {
    pub fn new(repository: Arc<R>, config: ThrottlingConfig) -> Self {
        Self::with_clock(repository, config, Arc::new(SystemClock))
    }

    pub fn with_clock(repository: Arc<R>, config: ThrottlingConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            repository,
            clock,
            config,
        }
    }

    pub fn config(&self) -> &ThrottlingConfig {
        &self.config
    }

    /// Whether the pair has reached the failed attempt limit.
    ///
    /// Counts failed attempts with `attempted_at >= now - window` and returns
    /// `true` once that count is at least `max_login_attempts`. Storage errors
    /// are propagated; the guard does not fail open or closed on its own.
    pub async fn is_login_blocked(&self, ip_address: &str, identifier: &str) -> Result<bool, Error> {
        let since = self.clock.now() - self.config.throttling_window;

        let attempts = self
            .repository
            .find_since(ip_address, identifier, since)
            .await?;

        let failed = attempts
            .iter()
            .filter(|attempt| !attempt.success && attempt.attempted_at >= since)
            .count();

        let blocked = failed >= self.config.max_login_attempts as usize;
        if blocked {
            tracing::warn!(
                ip_address = %ip_address,
                identifier = %identifier,
                failed_attempts = failed,
                "Login blocked by throttling"
            );
        }

        Ok(blocked)
    }

    /// Append an attempt to the log, stamped with the current time.
    pub async fn record_attempt(
        &self,
        ip_address: &str,
        identifier: &str,
        success: bool,
    ) -> Result<(), Error> {
        let attempt = LoginAttempt::new(ip_address, identifier, success, self.clock.now());
        self.repository.record(&attempt).await
    }
}
