mod file;
mod message;
pub mod smtp;

pub use file::FileTransport;
pub use smtp::{SmtpTransport, TlsConfig};

pub(crate) use message::build_message;
