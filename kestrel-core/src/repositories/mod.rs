//! Repository traits for data access layer
//!
//! Services never talk to a database directly. They are handed repository
//! implementations at construction time, which keeps the account logic
//! testable against in-memory doubles.
//!
//! # Trait Hierarchy
//!
//! - Individual `*Repository` traits define the operations for each data domain
//! - Individual `*RepositoryProvider` traits give access to each repository type
//! - [`RepositoryProvider`] combines every provider trait with lifecycle methods

pub mod adapter;
pub mod login_attempt;
pub mod password;
pub mod password_reset;
pub mod refresh_token;
pub mod user;

pub use adapter::{
    LoginAttemptRepositoryAdapter, PasswordRepositoryAdapter, PasswordResetRepositoryAdapter,
    RefreshTokenRepositoryAdapter, UserRepositoryAdapter,
};
pub use login_attempt::LoginAttemptRepository;
pub use password::PasswordRepository;
pub use password_reset::PasswordResetRepository;
pub use refresh_token::RefreshTokenRepository;
pub use user::UserRepository;

use async_trait::async_trait;

use crate::Error;

pub trait UserRepositoryProvider: Send + Sync + 'static {
    type UserRepo: UserRepository;

    fn user(&self) -> &Self::UserRepo;
}

pub trait PasswordRepositoryProvider: Send + Sync + 'static {
    type PasswordRepo: PasswordRepository;

    fn password(&self) -> &Self::PasswordRepo;
}

/// Provider trait for the login attempt log used by throttling.
pub trait LoginAttemptRepositoryProvider: Send + Sync + 'static {
    type LoginAttemptRepo: LoginAttemptRepository;

    fn login_attempt(&self) -> &Self::LoginAttemptRepo;
}

pub trait RefreshTokenRepositoryProvider: Send + Sync + 'static {
    type RefreshTokenRepo: RefreshTokenRepository;

    fn refresh_token(&self) -> &Self::RefreshTokenRepo;
}

pub trait PasswordResetRepositoryProvider: Send + Sync + 'static {
    type PasswordResetRepo: PasswordResetRepository;

    fn password_reset(&self) -> &Self::PasswordResetRepo;
}

/// Provider trait that storage backends implement to supply every repository.
///
/// # Example
///
/// ```rust,ignore
/// use kestrel_core::repositories::*;
///
/// struct MyStorage { /* ... */ }
///
/// impl UserRepositoryProvider for MyStorage {
///     type UserRepo = MyUserRepository;
///     fn user(&self) -> &Self::UserRepo { &self.user_repo }
/// }
///
/// // ... implement the other provider traits ...
///
/// #[async_trait]
/// impl RepositoryProvider for MyStorage {
///     async fn migrate(&self) -> Result<(), Error> { /* ... */ }
///     async fn health_check(&self) -> Result<(), Error> { /* ... */ }
/// }
/// ```
#[async_trait]
pub trait RepositoryProvider:
    UserRepositoryProvider
    + PasswordRepositoryProvider
    + LoginAttemptRepositoryProvider
    + RefreshTokenRepositoryProvider
    + PasswordResetRepositoryProvider
{
    /// Run migrations for all repositories
    async fn migrate(&self) -> Result<(), Error>;

    /// Health check for all repositories
    async fn health_check(&self) -> Result<(), Error>;
}
