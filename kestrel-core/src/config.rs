//! Runtime configuration read from the environment
//!
//! Every config has a `from_env` constructor plus a `from_lookup` variant that
//! takes the variable source as a closure.

use std::fmt::Display;
use std::str::FromStr;

use chrono::Duration;

use crate::{error::ConfigError, jwt::JwtConfig};

pub const MAX_LOGIN_ATTEMPTS: &str = "MAX_LOGIN_ATTEMPTS";
pub const THROTTLING_TIME_IN_MINUTES: &str = "THROTTLING_TIME_IN_MINUTES";
pub const JWT_SECRET: &str = "JWT_SECRET";
pub const JWT_ISSUER: &str = "JWT_ISSUER";
pub const ACCESS_TOKEN_TTL_MINUTES: &str = "ACCESS_TOKEN_TTL_MINUTES";
pub const REFRESH_TOKEN_TTL_DAYS: &str = "REFRESH_TOKEN_TTL_DAYS";
pub const PASSWORD_RESET_URL: &str = "PASSWORD_RESET_URL";
pub const PASSWORD_RESET_TTL_MINUTES: &str = "PASSWORD_RESET_TTL_MINUTES";

/// Limits for the login throttling guard.
#[derive(Debug, Clone)]
pub struct ThrottlingConfig {
    /// Failed attempts inside the window that block further logins
    pub max_login_attempts: u32,
    /// Trailing interval over which failures are counted
    pub throttling_window: Duration,
}

impl Default for ThrottlingConfig {
    fn default() -> Self {
        Self {
            max_login_attempts: 3,
            throttling_window: Duration::minutes(15),
        }
    }
}

impl ThrottlingConfig {
    pub fn new(max_login_attempts: u32, throttling_window: Duration) -> Self {
        Self {
            max_login_attempts,
            throttling_window,
        }
    }

    /// Read `MAX_LOGIN_ATTEMPTS` and `THROTTLING_TIME_IN_MINUTES`, falling back
    /// to 3 attempts and 15 minutes.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let max_login_attempts =
            parse_positive(&lookup, MAX_LOGIN_ATTEMPTS, defaults.max_login_attempts)?;
        let minutes = parse_positive(
            &lookup,
            THROTTLING_TIME_IN_MINUTES,
            defaults.throttling_window.num_minutes(),
        )?;

        Ok(Self {
            max_login_attempts,
            throttling_window: Duration::minutes(minutes),
        })
    }
}

/// Lifetimes and signing keys for issued tokens.
#[derive(Debug, Clone)]
pub struct TokenConfig {
    pub jwt: JwtConfig,
    pub access_token_ttl: Duration,
    pub refresh_token_ttl: Duration,
}

impl TokenConfig {
    pub fn new(jwt: JwtConfig) -> Self {
        Self {
            jwt,
            access_token_ttl: Duration::minutes(15),
            refresh_token_ttl: Duration::days(30),
        }
    }

    pub fn with_access_token_ttl(mut self, ttl: Duration) -> Self {
        self.access_token_ttl = ttl;
        self
    }

    pub fn with_refresh_token_ttl(mut self, ttl: Duration) -> Self {
        self.refresh_token_ttl = ttl;
        self
    }

    /// `JWT_SECRET` is required; everything else has a default.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secret = lookup(JWT_SECRET)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ConfigError::Missing(JWT_SECRET.to_string()))?;

        let mut jwt = JwtConfig::new_hs256(secret.into_bytes());
        if let Some(issuer) = lookup(JWT_ISSUER) {
            jwt = jwt.with_issuer(issuer);
        }

        let access_minutes = parse_positive(&lookup, ACCESS_TOKEN_TTL_MINUTES, 15i64)?;
        let refresh_days = parse_positive(&lookup, REFRESH_TOKEN_TTL_DAYS, 30i64)?;

        Ok(Self::new(jwt)
            .with_access_token_ttl(Duration::minutes(access_minutes))
            .with_refresh_token_ttl(Duration::days(refresh_days)))
    }
}

/// Settings for the password reset flow.
#[derive(Debug, Clone)]
pub struct PasswordResetConfig {
    /// Page that completes the reset; the token is appended as `?token=`
    pub finish_url: String,
    pub token_ttl: Duration,
}

impl Default for PasswordResetConfig {
    fn default() -> Self {
        Self {
            finish_url: "http://localhost:3000/password-reset/finish".to_string(),
            token_ttl: Duration::hours(1),
        }
    }
}

impl PasswordResetConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let minutes = parse_positive(
            &lookup,
            PASSWORD_RESET_TTL_MINUTES,
            defaults.token_ttl.num_minutes(),
        )?;

        Ok(Self {
            finish_url: lookup(PASSWORD_RESET_URL).unwrap_or(defaults.finish_url),
            token_ttl: Duration::minutes(minutes),
        })
    }

    /// The link sent to the user for a given reset token.
    pub fn finish_url_for(&self, token: &str) -> String {
        let separator = if self.finish_url.contains('?') { '&' } else { '?' };
        format!("{}{separator}token={token}", self.finish_url)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid {
            key: key.to_string(),
            value,
        }),
        None => Ok(default),
    }
}

/// Like [`parse_or`], but zero and negative values are rejected.
fn parse_positive<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + PartialOrd + Default + Display,
{
    let value = parse_or(lookup, key, default)?;
    if value <= T::default() {
        return Err(ConfigError::Invalid {
            key: key.to_string(),
            value: value.to_string(),
        });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_throttling_defaults() {
        let config = ThrottlingConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.max_login_attempts, 3);
        assert_eq!(config.throttling_window, Duration::minutes(15));
    }

    #[test]
    fn test_throttling_overrides() {
        let config = ThrottlingConfig::from_lookup(lookup(&[
            (MAX_LOGIN_ATTEMPTS, "5"),
            (THROTTLING_TIME_IN_MINUTES, "30"),
        ]))
        .unwrap();
        assert_eq!(config.max_login_attempts, 5);
        assert_eq!(config.throttling_window, Duration::minutes(30));
    }

    #[test]
    fn test_throttling_rejects_garbage() {
        let result = ThrottlingConfig::from_lookup(lookup(&[(MAX_LOGIN_ATTEMPTS, "three")]));
        assert!(matches!(
            result,
            Err(ConfigError::Invalid { ref key, .. }) if key == MAX_LOGIN_ATTEMPTS
        ));
    }

    fn assert_rejected<T: std::fmt::Debug>(result: Result<T, ConfigError>, expected: &str) {
        match result {
            Err(ConfigError::Invalid { key, .. }) => assert_eq!(key, expected),
            other => panic!("Expected {expected} to be rejected, got {other:?}"),
        }
    }

    #[test]
    fn test_throttling_rejects_non_positive() {
        for value in ["0", "-1"] {
            assert_rejected(
                ThrottlingConfig::from_lookup(lookup(&[(THROTTLING_TIME_IN_MINUTES, value)])),
                THROTTLING_TIME_IN_MINUTES,
            );
        }
        assert_rejected(
            ThrottlingConfig::from_lookup(lookup(&[(MAX_LOGIN_ATTEMPTS, "0")])),
            MAX_LOGIN_ATTEMPTS,
        );
        // u32 cannot hold a negative count
        assert_rejected(
            ThrottlingConfig::from_lookup(lookup(&[(MAX_LOGIN_ATTEMPTS, "-3")])),
            MAX_LOGIN_ATTEMPTS,
        );
    }

    #[test]
    fn test_token_config_rejects_non_positive_ttl() {
        let secret = (JWT_SECRET, "a-very-long-signing-secret-for-tests");
        for key in [ACCESS_TOKEN_TTL_MINUTES, REFRESH_TOKEN_TTL_DAYS] {
            for value in ["0", "-5"] {
                assert_rejected(
                    TokenConfig::from_lookup(lookup(&[secret, (key, value)])),
                    key,
                );
            }
        }
    }

    #[test]
    fn test_password_reset_rejects_non_positive_ttl() {
        for value in ["0", "-60"] {
            assert_rejected(
                PasswordResetConfig::from_lookup(lookup(&[(PASSWORD_RESET_TTL_MINUTES, value)])),
                PASSWORD_RESET_TTL_MINUTES,
            );
        }
    }

    #[test]
    fn test_token_config_requires_secret() {
        let result = TokenConfig::from_lookup(lookup(&[]));
        assert!(matches!(result, Err(ConfigError::Missing(ref key)) if key == JWT_SECRET));
    }

    #[test]
    fn test_token_config_from_lookup() {
        let config = TokenConfig::from_lookup(lookup(&[
            (JWT_SECRET, "a-very-long-signing-secret-for-tests"),
            (JWT_ISSUER, "kestrel"),
            (ACCESS_TOKEN_TTL_MINUTES, "5"),
        ]))
        .unwrap();

        assert_eq!(config.jwt.issuer.as_deref(), Some("kestrel"));
        assert_eq!(config.access_token_ttl, Duration::minutes(5));
        assert_eq!(config.refresh_token_ttl, Duration::days(30));
    }

    #[test]
    fn test_finish_url_for() {
        let config = PasswordResetConfig::default();
        assert_eq!(
            config.finish_url_for("abc"),
            "http://localhost:3000/password-reset/finish?token=abc"
        );

        let config = PasswordResetConfig {
            finish_url: "https://app.example.com/reset?source=email".to_string(),
            ..PasswordResetConfig::default()
        };
        assert_eq!(
            config.finish_url_for("abc"),
            "https://app.example.com/reset?source=email&token=abc"
        );
    }
}
