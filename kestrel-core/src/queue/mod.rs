//! Queued job dispatch
//!
//! Work that should not hold up a request, such as sending email, is pushed
//! onto a named queue as a [`QueuedMessage`] and picked up by a worker. The
//! dispatcher only enqueues; delivery guarantees are whatever the
//! [`QueueTransport`] provides, and nothing here retries.

pub mod email;
pub mod memory;

pub use email::EmailQueue;
pub use memory::InMemoryQueue;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{QueueError, TransportError};

/// A job waiting on a queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedMessage {
    /// Which handler the worker should run, e.g. `passwordReset`
    pub job: String,
    pub payload: HashMap<String, String>,
    pub queued_at: DateTime<Utc>,
}

impl QueuedMessage {
    pub fn new(job: impl Into<String>, payload: HashMap<String, String>) -> Self {
        Self {
            job: job.into(),
            payload,
            queued_at: Utc::now(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.payload.get(key).map(String::as_str)
    }
}

/// The message broker underneath the dispatcher.
#[async_trait]
pub trait QueueTransport: Send + Sync + 'static {
    async fn push(&self, queue: &str, message: QueuedMessage) -> Result<(), TransportError>;
}

#[async_trait]
impl<T: QueueTransport + ?Sized> QueueTransport for Arc<T> {
    async fn push(&self, queue: &str, message: QueuedMessage) -> Result<(), TransportError> {
        (**self).push(queue, message).await
    }
}

/// Pushes jobs through a [`QueueTransport`], translating transport failures.
pub struct QueueDispatcher<T: QueueTransport> {
    transport: Arc<T>,
}

impl<T: QueueTransport> QueueDispatcher<T> {
    pub fn new(transport: Arc<T>) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    /// Enqueue `job` on `queue` with `context` as its payload.
    ///
    /// A runtime failure inside the transport becomes [`QueueError::Push`];
    /// the transport's own error is logged but not returned. Connection
    /// failures and closed transports pass through as
    /// [`QueueError::Transport`].
    pub async fn queue_message(
        &self,
        job: &str,
        queue: &str,
        context: HashMap<String, String>,
    ) -> Result<&Self, QueueError> {
        let message = QueuedMessage::new(job, context);

        match self.transport.push(queue, message).await {
            Ok(()) => {
                tracing::debug!(job = %job, queue = %queue, "Queued message");
                Ok(self)
            }
            Err(TransportError::Runtime(reason)) => {
                tracing::warn!(job = %job, queue = %queue, error = %reason, "Failed to push message");
                Err(QueueError::Push {
                    queue: queue.to_string(),
                    reason: format!("could not enqueue job {job}"),
                })
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Records pushes, or fails every push with a fixed error.
    #[derive(Default)]
    struct MockTransport {
        pushed: Mutex<Vec<(String, QueuedMessage)>>,
        failure: Option<TransportError>,
    }

    impl MockTransport {
        fn failing(error: TransportError) -> Self {
            Self {
                pushed: Mutex::new(Vec::new()),
                failure: Some(error),
            }
        }
    }

    #[async_trait]
    impl QueueTransport for MockTransport {
        async fn push(&self, queue: &str, message: QueuedMessage) -> Result<(), TransportError> {
            if let Some(error) = &self.failure {
                return Err(error.clone());
            }
            self.pushed
                .lock()
                .unwrap()
                .push((queue.to_string(), message));
            Ok(())
        }
    }

    fn context() -> HashMap<String, String> {
        HashMap::from([("recipient".to_string(), "alice@example.com".to_string())])
    }

    #[tokio::test]
    async fn test_queue_message_pushes_job() {
        let transport = Arc::new(MockTransport::default());
        let dispatcher = QueueDispatcher::new(transport.clone());

        dispatcher
            .queue_message("passwordReset", "email", context())
            .await
            .unwrap();

        let pushed = transport.pushed.lock().unwrap();
        assert_eq!(pushed.len(), 1);
        assert_eq!(pushed[0].0, "email");
        assert_eq!(pushed[0].1.job, "passwordReset");
        assert_eq!(pushed[0].1.get("recipient"), Some("alice@example.com"));
    }

    #[tokio::test]
    async fn test_queue_message_chains() {
        let transport = Arc::new(MockTransport::default());
        let dispatcher = QueueDispatcher::new(transport.clone());

        dispatcher
            .queue_message("a", "email", HashMap::new())
            .await
            .unwrap()
            .queue_message("b", "email", HashMap::new())
            .await
            .unwrap();

        assert_eq!(transport.pushed.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_runtime_error_becomes_push_error() {
        let dispatcher = QueueDispatcher::new(Arc::new(MockTransport::failing(
            TransportError::Runtime("channel 7 closed by broker: secret-host:5672".to_string()),
        )));

        let result = dispatcher
            .queue_message("passwordReset", "email", context())
            .await;

        match result {
            Err(QueueError::Push { queue, reason }) => {
                assert_eq!(queue, "email");
                assert!(!reason.contains("secret-host"));
            }
            Err(other) => panic!("Expected push error, got {other:?}"),
            Ok(_) => panic!("Expected push error, got Ok"),
        }
    }

    #[tokio::test]
    async fn test_connection_error_propagates() {
        let dispatcher = QueueDispatcher::new(Arc::new(MockTransport::failing(
            TransportError::Connection("refused".to_string()),
        )));

        let result = dispatcher
            .queue_message("passwordReset", "email", context())
            .await;

        assert!(matches!(
            result,
            Err(QueueError::Transport(TransportError::Connection(_)))
        ));
    }

    #[test]
    fn test_message_serializes() {
        let message = QueuedMessage::new("passwordReset", context());
        let json = serde_json::to_string(&message).unwrap();
        let decoded: QueuedMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, message);
    }
}
