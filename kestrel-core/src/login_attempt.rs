//! Login attempts
//!
//! One record is written per authentication attempt, successful or not.
//! Records are append-only; the throttling guard only ever reads them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginAttempt {
    /// Client address as reported by the caller; not validated here
    pub ip_address: String,
    /// What the client tried to log in as, usually an email
    pub identifier: String,
    pub attempted_at: DateTime<Utc>,
    pub success: bool,
}

impl LoginAttempt {
    pub fn new(
        ip_address: impl Into<String>,
        identifier: impl Into<String>,
        success: bool,
        attempted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            ip_address: ip_address.into(),
            identifier: identifier.into(),
            attempted_at,
            success,
        }
    }

    pub fn failed(
        ip_address: impl Into<String>,
        identifier: impl Into<String>,
        attempted_at: DateTime<Utc>,
    ) -> Self {
        Self::new(ip_address, identifier, false, attempted_at)
    }

    pub fn succeeded(
        ip_address: impl Into<String>,
        identifier: impl Into<String>,
        attempted_at: DateTime<Utc>,
    ) -> Self {
        Self::new(ip_address, identifier, true, attempted_at)
    }
}
