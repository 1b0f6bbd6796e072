use crate::transports::build_message;
use crate::{Email, Mailer, MailerError};
use async_trait::async_trait;
use lettre::Transport;
use lettre::transport::file::FileTransport as LettreFileTransport;
use std::path::{Path, PathBuf};

/// Writes each message as an `.eml` file into a directory.
#[derive(Debug, Clone)]
pub struct FileTransport {
    transport: LettreFileTransport,
    output_dir: PathBuf,
}

impl FileTransport {
    pub fn new<P: AsRef<Path>>(output_dir: P) -> Result<Self, MailerError> {
        let output_dir = output_dir.as_ref().to_path_buf();

        if !output_dir.exists() {
            std::fs::create_dir_all(&output_dir)?;
        }

        let transport = LettreFileTransport::new(&output_dir);

        Ok(Self {
            transport,
            output_dir,
        })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

#[async_trait]
impl Mailer for FileTransport {
    async fn send_email(&self, email: Email) -> Result<(), MailerError> {
        let message = build_message(email)?;

        // lettre's file transport is blocking
        let transport = self.transport.clone();
        tokio::task::spawn_blocking(move || transport.send(&message))
            .await
            .map_err(|e| MailerError::Builder(format!("Failed to write email: {e}")))??;

        tracing::debug!(output_dir = %self.output_dir.display(), "Wrote email to file");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_file_transport_writes_eml() {
        let temp_dir = tempdir().unwrap();
        let transport = FileTransport::new(temp_dir.path()).unwrap();

        let email = Email::builder()
            .from("noreply@kestrel.dev")
            .to("alice@example.com")
            .subject("Reset your password")
            .text_body("Follow the link")
            .build()
            .unwrap();

        transport.send_email(email).await.unwrap();

        let entries = std::fs::read_dir(temp_dir.path()).unwrap();
        assert_eq!(entries.count(), 1);
    }

    #[test]
    fn test_file_transport_creates_directory() {
        let temp_dir = tempdir().unwrap();
        let nested = temp_dir.path().join("outbox");
        let transport = FileTransport::new(&nested).unwrap();

        assert!(nested.exists());
        assert_eq!(transport.output_dir(), nested.as_path());
    }
}
