//! Background delivery for the `email` queue
//!
//! Messages arrive already rendered, so the worker only wraps the content in
//! an [`Email`](kestrel_mailer::Email) and hands it to the configured
//! [`Mailer`]. A failed delivery is logged and dropped; there is no retry.

use std::sync::Arc;

use kestrel_core::QueuedMessage;
use kestrel_core::queue::email::{CONTENT_KEY, PASSWORD_RESET_JOB, RECIPIENT_KEY};
use kestrel_mailer::{Mailer, MailerConfig, PasswordResetEmail};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::KestrelError;

pub struct EmailWorker<M: Mailer> {
    mailer: Arc<M>,
    from: String,
    app_name: String,
}

impl<M: Mailer + 'static> EmailWorker<M> {
    pub fn new(mailer: Arc<M>, config: &MailerConfig) -> Self {
        Self {
            mailer,
            from: config.get_from_address(),
            app_name: config.app_name.clone(),
        }
    }

    /// Deliver one message.
    ///
    /// Jobs this worker does not know are skipped with a warning.
    pub async fn handle(&self, message: QueuedMessage) -> Result<(), KestrelError> {
        match message.job.as_str() {
            PASSWORD_RESET_JOB => {
                let recipient = required(&message, RECIPIENT_KEY)?;
                let content = required(&message, CONTENT_KEY)?;

                let email =
                    PasswordResetEmail::build(&self.from, recipient, &self.app_name, content)
                        .map_err(|e| KestrelError::MailerError(e.to_string()))?;

                self.mailer
                    .send_email(email)
                    .await
                    .map_err(|e| KestrelError::MailerError(e.to_string()))?;

                tracing::info!(job = %message.job, "Delivered queued email");
                Ok(())
            }
            job => {
                tracing::warn!(job = %job, "Skipping email job with no handler");
                Ok(())
            }
        }
    }

    /// Consume `receiver` until it closes or `shutdown` changes.
    pub fn start(
        self,
        mut receiver: mpsc::UnboundedReceiver<QueuedMessage>,
        mut shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    message = receiver.recv() => {
                        let Some(message) = message else {
                            tracing::info!("Email queue closed");
                            break;
                        };
                        let job = message.job.clone();
                        if let Err(e) = self.handle(message).await {
                            tracing::error!(job = %job, error = %e, "Failed to deliver queued email");
                        }
                    }
                    _ = shutdown.changed() => {
                        tracing::info!("Shutting down email worker");
                        break;
                    }
                }
            }
        })
    }
}

fn required<'a>(message: &'a QueuedMessage, key: &str) -> Result<&'a str, KestrelError> {
    message.get(key).ok_or_else(|| {
        KestrelError::QueueError(format!("{} message is missing {key}", message.job))
    })
}
