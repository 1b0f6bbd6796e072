//! Process-level configuration
//!
//! Collects the per-service configs into one value. Variables may come from
//! the process environment or a `.env` file in the working directory.

use kestrel_core::{PasswordResetConfig, ThrottlingConfig, TokenConfig};
use kestrel_mailer::MailerConfig;

use crate::KestrelError;

#[derive(Debug, Clone)]
pub struct KestrelConfig {
    pub throttling: ThrottlingConfig,
    pub tokens: TokenConfig,
    pub password_reset: PasswordResetConfig,
    pub mailer: MailerConfig,
}

impl KestrelConfig {
    /// Defaults for everything except the token signing configuration.
    pub fn new(tokens: TokenConfig) -> Self {
        Self {
            throttling: ThrottlingConfig::default(),
            tokens,
            password_reset: PasswordResetConfig::default(),
            mailer: MailerConfig::default(),
        }
    }

    pub fn with_throttling(mut self, throttling: ThrottlingConfig) -> Self {
        self.throttling = throttling;
        self
    }

    pub fn with_password_reset(mut self, password_reset: PasswordResetConfig) -> Self {
        self.password_reset = password_reset;
        self
    }

    pub fn with_mailer(mut self, mailer: MailerConfig) -> Self {
        self.mailer = mailer;
        self
    }

    /// Load `.env` if present, then read every section from the environment.
    pub fn from_env() -> Result<Self, KestrelError> {
        load_dotenv();
        Self::from_process_env()
    }

    /// Read every section from the environment as it stands.
    pub fn from_process_env() -> Result<Self, KestrelError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, KestrelError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            throttling: ThrottlingConfig::from_lookup(&lookup).map_err(config_error)?,
            tokens: TokenConfig::from_lookup(&lookup).map_err(config_error)?,
            password_reset: PasswordResetConfig::from_lookup(&lookup).map_err(config_error)?,
            mailer: MailerConfig::from_lookup(&lookup).map_err(config_error)?,
        })
    }
}

/// Load `.env` from the working directory into the environment.
///
/// A missing file is silent. A file that cannot be read or parsed is
/// logged and otherwise ignored. Returns whether a file was loaded.
pub fn load_dotenv() -> bool {
    report_dotenv(dotenvy::dotenv())
}

fn report_dotenv(result: dotenvy::Result<std::path::PathBuf>) -> bool {
    match result {
        Ok(path) => {
            tracing::debug!(path = %path.display(), "Loaded .env file");
            true
        }
        Err(e) if e.not_found() => false,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load .env file");
            false
        }
    }
}

fn config_error(e: impl std::fmt::Display) -> KestrelError {
    KestrelError::ConfigError(e.to_string())
}
