//! Email jobs
//!
//! Emails are rendered at enqueue time and shipped as `{recipient, content}`
//! so the worker only has to wrap and send them.

use std::collections::HashMap;
use std::sync::Arc;

use kestrel_mailer::PasswordResetEmail;

use super::{QueueDispatcher, QueueTransport};
use crate::error::QueueError;

pub const EMAIL_QUEUE: &str = "email";
pub const PASSWORD_RESET_JOB: &str = "passwordReset";
pub const PROJECT_INVITE_JOB: &str = "projectInvite";

pub const RECIPIENT_KEY: &str = "recipient";
pub const CONTENT_KEY: &str = "content";

pub struct EmailQueue<T: QueueTransport> {
    dispatcher: QueueDispatcher<T>,
    app_name: String,
}

impl<T: QueueTransport> EmailQueue<T> {
    pub fn new(transport: Arc<T>, app_name: impl Into<String>) -> Self {
        Self {
            dispatcher: QueueDispatcher::new(transport),
            app_name: app_name.into(),
        }
    }

    pub fn dispatcher(&self) -> &QueueDispatcher<T> {
        &self.dispatcher
    }

    /// Render a password reset email and enqueue it on the `email` queue.
    pub async fn password_reset_email(
        &self,
        recipient: &str,
        finish_url: &str,
    ) -> Result<&Self, QueueError> {
        let content = PasswordResetEmail::render(&self.app_name, recipient, finish_url)
            .map_err(|e| QueueError::Render(e.to_string()))?;

        let context = HashMap::from([
            (RECIPIENT_KEY.to_string(), recipient.to_string()),
            (CONTENT_KEY.to_string(), content),
        ]);

        self.dispatcher
            .queue_message(PASSWORD_RESET_JOB, EMAIL_QUEUE, context)
            .await?;
        Ok(self)
    }

    /// Project invitations have no email defined yet; nothing is queued.
    pub async fn project_invite(
        &self,
        _recipient: &str,
        _project_name: &str,
    ) -> Result<&Self, QueueError> {
        Err(QueueError::Unimplemented(PROJECT_INVITE_JOB))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use crate::queue::InMemoryQueue;

    #[tokio::test]
    async fn test_password_reset_email_payload() {
        let transport = Arc::new(InMemoryQueue::new());
        let mut receiver = transport.subscribe(EMAIL_QUEUE);
        let queue = EmailQueue::new(transport, "Kestrel");

        queue
            .password_reset_email(
                "alice@example.com",
                "https://app.kestrel.dev/password-reset/finish?token=abc",
            )
            .await
            .unwrap();

        let message = receiver.recv().await.unwrap();
        assert_eq!(message.job, PASSWORD_RESET_JOB);
        assert_eq!(message.payload.len(), 2);
        assert_eq!(message.get(RECIPIENT_KEY), Some("alice@example.com"));

        let content = message.get(CONTENT_KEY).unwrap();
        assert!(content.contains("https://app.kestrel.dev/password-reset/finish?token=abc"));
    }

    #[tokio::test]
    async fn test_project_invite_is_unimplemented() {
        let transport = Arc::new(InMemoryQueue::new());
        let mut receiver = transport.subscribe(EMAIL_QUEUE);
        let queue = EmailQueue::new(transport, "Kestrel");

        let result = queue.project_invite("bob@example.com", "Apollo").await;

        assert!(matches!(
            result,
            Err(QueueError::Unimplemented(PROJECT_INVITE_JOB))
        ));
        assert!(receiver.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_dead_consumer_surfaces_as_push_error() {
        let transport = Arc::new(InMemoryQueue::new());
        drop(transport.subscribe(EMAIL_QUEUE));
        let queue = EmailQueue::new(transport, "Kestrel");

        let result = queue
            .password_reset_email("alice@example.com", "https://x/finish?token=abc")
            .await;

        assert!(matches!(result, Err(QueueError::Push { .. })));
        assert!(!matches!(
            result,
            Err(QueueError::Transport(TransportError::Runtime(_)))
        ));
    }
}
