//! Repository trait for the login attempt log.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{Error, LoginAttempt};

/// Append-only store of authentication attempts.
///
/// The log is shared by concurrent logins for the same identifier.
/// Implementations rely on the backing store's per-row atomicity; no
/// cross-row locking is expected.
#[async_trait]
pub trait LoginAttemptRepository: Send + Sync + 'static {
    /// Append an attempt to the log.
    async fn record(&self, attempt: &LoginAttempt) -> Result<(), Error>;

    /// Fetch attempts for an `(ip_address, identifier)` pair.
    ///
    /// # Arguments
    ///
    /// * `ip_address` - The client address, matched exactly
    /// * `identifier` - The login identifier, matched exactly
    /// * `since` - Inclusive lower bound on `attempted_at`
    ///
    /// # Returns
    ///
    /// Both successful and failed attempts with `attempted_at >= since`, in
    /// no particular order. An empty log yields an empty vector.
    async fn find_since(
        &self,
        ip_address: &str,
        identifier: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<LoginAttempt>, Error>;
}
