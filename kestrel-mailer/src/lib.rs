//! Outbound email for kestrel
//!
//! This crate builds [`Email`] messages, renders the account emails that the
//! core queues for delivery, and ships them through a [`Mailer`] transport
//! (SMTP for production, a file drop for development).
pub mod config;
pub mod email;
pub mod error;
pub mod mailer;
pub mod templates;
pub mod transports;

pub use config::{MailerConfig, TransportConfig};
pub use email::{Email, EmailBuilder};
pub use error::MailerError;
pub use mailer::Mailer;
pub use templates::PasswordResetEmail;
pub use transports::{FileTransport, SmtpTransport};

pub mod prelude {
    pub use crate::{
        Email, EmailBuilder, FileTransport, Mailer, MailerConfig, MailerError, PasswordResetEmail,
        SmtpTransport,
    };
}
