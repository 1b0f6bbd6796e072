//! Service layer for business logic
//!
//! Services are generic over the repository traits they need and hold them
//! behind `Arc`, so one storage backend can be shared by all of them.

pub mod password;
pub mod password_reset;
pub mod throttling;
pub mod token;
pub mod user;

pub use password::PasswordService;
pub use password_reset::PasswordResetService;
pub use throttling::LoginThrottlingService;
pub use token::TokenService;
pub use user::UserService;
