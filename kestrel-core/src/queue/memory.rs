//! In-process queue transport.

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::mpsc;

use super::{QueueTransport, QueuedMessage};
use crate::error::TransportError;

enum Channel {
    /// Nobody has subscribed yet; messages are held until someone does
    Pending(mpsc::UnboundedSender<QueuedMessage>, mpsc::UnboundedReceiver<QueuedMessage>),
    Subscribed(mpsc::UnboundedSender<QueuedMessage>),
}

/// A [`QueueTransport`] backed by tokio channels, one per queue name.
///
/// Each queue has a single consumer. Pushing to a queue whose consumer has
/// gone away is a runtime error.
#[derive(Default)]
pub struct InMemoryQueue {
    channels: DashMap<String, Channel>,
}

impl InMemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the receiving end of `queue`.
    ///
    /// Messages pushed before the first subscription are delivered to it.
    /// Subscribing again replaces the previous consumer.
    pub fn subscribe(&self, queue: &str) -> mpsc::UnboundedReceiver<QueuedMessage> {
        let previous = self.channels.remove(queue).map(|(_, channel)| channel);

        let (channel, receiver) = match previous {
            Some(Channel::Pending(sender, receiver)) => (Channel::Subscribed(sender), receiver),
            _ => {
                let (sender, receiver) = mpsc::unbounded_channel();
                (Channel::Subscribed(sender), receiver)
            }
        };

        self.channels.insert(queue.to_string(), channel);
        receiver
    }
}

#[async_trait]
impl QueueTransport for InMemoryQueue {
    async fn push(&self, queue: &str, message: QueuedMessage) -> Result<(), TransportError> {
        let channel = self.channels.entry(queue.to_string()).or_insert_with(|| {
            let (sender, receiver) = mpsc::unbounded_channel();
            Channel::Pending(sender, receiver)
        });

        let sender = match channel.value() {
            Channel::Pending(sender, _) | Channel::Subscribed(sender) => sender,
        };

        sender
            .send(message)
            .map_err(|_| TransportError::Runtime(format!("consumer for queue {queue} is gone")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn message(job: &str) -> QueuedMessage {
        QueuedMessage::new(job, HashMap::new())
    }

    #[tokio::test]
    async fn test_push_then_subscribe_delivers() {
        let queue = InMemoryQueue::new();
        queue.push("email", message("first")).await.unwrap();

        let mut receiver = queue.subscribe("email");
        queue.push("email", message("second")).await.unwrap();

        assert_eq!(receiver.recv().await.unwrap().job, "first");
        assert_eq!(receiver.recv().await.unwrap().job, "second");
    }

    #[tokio::test]
    async fn test_queues_are_separate() {
        let queue = InMemoryQueue::new();
        let mut email = queue.subscribe("email");
        let mut other = queue.subscribe("other");

        queue.push("other", message("job")).await.unwrap();

        assert!(email.try_recv().is_err());
        assert_eq!(other.recv().await.unwrap().job, "job");
    }

    #[tokio::test]
    async fn test_dropped_consumer_is_runtime_error() {
        let queue = InMemoryQueue::new();
        drop(queue.subscribe("email"));

        let result = queue.push("email", message("job")).await;
        assert!(matches!(result, Err(TransportError::Runtime(_))));
    }
}
