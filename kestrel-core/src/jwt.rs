//! Signed access tokens
//!
//! Access tokens are short-lived JWTs carrying the user id. They are never
//! stored; the long-lived credential is the refresh token.

use std::path::Path;

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::{
    Error, UserId,
    error::{CryptoError, SessionError, ValidationError},
    id::generate_prefixed_id,
};

/// Claims carried by an access token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject - user ID
    pub sub: String,
    /// Issued at, seconds since the epoch
    pub iat: i64,
    /// Expiration, seconds since the epoch
    pub exp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    /// Unique token id
    pub jti: String,
}

impl AccessClaims {
    pub fn new(user_id: &UserId, issued_at: DateTime<Utc>, expires_at: DateTime<Utc>) -> Self {
        Self {
            sub: user_id.to_string(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
            iss: None,
            jti: generate_prefixed_id("jti"),
        }
    }

    pub fn user_id(&self) -> UserId {
        UserId::new(&self.sub)
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }

    /// Sign the claims, stamping the configured issuer.
    pub fn encode(mut self, config: &JwtConfig) -> Result<String, Error> {
        if self.iss.is_none() {
            self.iss = config.issuer.clone();
        }

        let header = Header::new(config.jwt_algorithm());
        let encoding_key = config.get_encoding_key()?;

        encode(&header, &self, &encoding_key)
            .map_err(|e| CryptoError::JwtSigning(e.to_string()).into())
    }

    /// Verify signature and issuer, then check expiry against `now`.
    ///
    /// A token is still valid in the second named by `exp`.
    pub fn decode(token: &str, config: &JwtConfig, now: DateTime<Utc>) -> Result<Self, Error> {
        let decoding_key = config.get_decoding_key()?;

        let claims = decode::<AccessClaims>(token, &decoding_key, &config.get_validation())
            .map(|data| data.claims)
            .map_err(|e| -> Error {
                SessionError::InvalidToken(format!("JWT validation failed: {e}")).into()
            })?;

        if claims.exp < now.timestamp() {
            return Err(SessionError::Expired.into());
        }

        Ok(claims)
    }
}

#[derive(Debug, Clone)]
pub enum JwtAlgorithm {
    /// RSA with SHA-256, keys in PEM format
    RS256 {
        private_key: Vec<u8>,
        public_key: Vec<u8>,
    },
    /// HMAC with SHA-256
    HS256 { secret_key: Vec<u8> },
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub algorithm: JwtAlgorithm,
    pub issuer: Option<String>,
}

impl JwtConfig {
    pub fn new_hs256(secret_key: Vec<u8>) -> Self {
        Self {
            algorithm: JwtAlgorithm::HS256 { secret_key },
            issuer: None,
        }
    }

    pub fn new_rs256(private_key: Vec<u8>, public_key: Vec<u8>) -> Self {
        Self {
            algorithm: JwtAlgorithm::RS256 {
                private_key,
                public_key,
            },
            issuer: None,
        }
    }

    pub fn from_rs256_pem_files(
        private_key_path: impl AsRef<Path>,
        public_key_path: impl AsRef<Path>,
    ) -> Result<Self, Error> {
        let private_key = std::fs::read(private_key_path).map_err(|e| {
            ValidationError::InvalidField(format!("Failed to read private key file: {e}"))
        })?;
        let public_key = std::fs::read(public_key_path).map_err(|e| {
            ValidationError::InvalidField(format!("Failed to read public key file: {e}"))
        })?;

        Ok(Self::new_rs256(private_key, public_key))
    }

    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    pub fn jwt_algorithm(&self) -> Algorithm {
        match &self.algorithm {
            JwtAlgorithm::RS256 { .. } => Algorithm::RS256,
            JwtAlgorithm::HS256 { .. } => Algorithm::HS256,
        }
    }

    pub fn get_encoding_key(&self) -> Result<EncodingKey, Error> {
        match &self.algorithm {
            JwtAlgorithm::RS256 { private_key, .. } => EncodingKey::from_rsa_pem(private_key)
                .map_err(|e| {
                    ValidationError::InvalidField(format!("Invalid RSA private key: {e}")).into()
                }),
            JwtAlgorithm::HS256 { secret_key } => Ok(EncodingKey::from_secret(secret_key)),
        }
    }

    pub fn get_decoding_key(&self) -> Result<DecodingKey, Error> {
        match &self.algorithm {
            JwtAlgorithm::RS256 { public_key, .. } => DecodingKey::from_rsa_pem(public_key)
                .map_err(|e| {
                    ValidationError::InvalidField(format!("Invalid RSA public key: {e}")).into()
                }),
            JwtAlgorithm::HS256 { secret_key } => Ok(DecodingKey::from_secret(secret_key)),
        }
    }

    pub fn get_validation(&self) -> Validation {
        // Expiry is checked by the caller against its own clock
        let mut validation = Validation::new(self.jwt_algorithm());
        validation.validate_exp = false;
        validation.leeway = 0;
        if let Some(issuer) = &self.issuer {
            validation.set_issuer(&[issuer]);
        }
        validation
    }
}
