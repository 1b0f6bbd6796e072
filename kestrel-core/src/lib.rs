//! Account security and session core for kestrel
//!
//! This crate holds the pieces of account handling that sit between a web
//! layer and storage:
//!
//! - [`services::LoginThrottlingService`] refuses logins after repeated failures
//! - [`services::TokenService`] issues JWT access tokens and stored refresh tokens
//! - [`services::PasswordService`] and [`services::PasswordResetService`] manage credentials
//! - [`queue::EmailQueue`] hands account emails to a background worker
//!
//! Storage is reached only through the traits in [`repositories`]; see the
//! `kestrel-storage-sqlite` crate for an implementation.
pub mod clock;
pub mod config;
pub mod crypto;
pub mod error;
pub mod id;
pub mod jwt;
pub mod login_attempt;
pub mod queue;
pub mod refresh_token;
pub mod repositories;
pub mod services;
pub mod user;
pub mod validation;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{PasswordResetConfig, ThrottlingConfig, TokenConfig};
pub use error::Error;
pub use jwt::{AccessClaims, JwtAlgorithm, JwtConfig};
pub use login_attempt::LoginAttempt;
pub use queue::{EmailQueue, InMemoryQueue, QueueDispatcher, QueueTransport, QueuedMessage};
pub use refresh_token::{RefreshToken, RefreshTokenId, RefreshTokenState, TokenPair};
pub use user::{NewUser, User, UserId};
