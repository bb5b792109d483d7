//! # Publish/subscribe transport.
//!
//! [`InMemoryPubSub`] keeps one `tokio::sync::broadcast` sender per channel.
//! A subscriber that falls more than the channel capacity behind loses the
//! oldest messages (logged), exactly like a real pub/sub backend would drop
//! messages for a slow consumer.

use async_trait::async_trait;
use dashmap::DashMap;
use futures::stream::{self, BoxStream, StreamExt};
use tokio::sync::broadcast;

use crate::error::TransportError;

/// Stream of raw messages received on a channel.
pub type MessageStream = BoxStream<'static, String>;

/// Fire-and-forget messaging on named channels.
#[async_trait]
pub trait PubSub: Send + Sync + 'static {
    /// Publishes `payload` to `channel`. No subscriber is not an error.
    async fn publish(&self, channel: &str, payload: &str) -> Result<(), TransportError>;

    /// Subscribes to `channel`. The stream ends after [`unsubscribe`](Self::unsubscribe).
    async fn subscribe(&self, channel: &str) -> Result<MessageStream, TransportError>;

    /// Drops the subscription(s) on `channel`.
    async fn unsubscribe(&self, channel: &str) -> Result<(), TransportError>;
}

/// Process-local [`PubSub`].
#[derive(Debug)]
pub struct InMemoryPubSub {
    channels: DashMap<String, broadcast::Sender<String>>,
    capacity: usize,
}

impl InMemoryPubSub {
    /// Default per-channel buffer.
    pub const DEFAULT_CAPACITY: usize = 1024;

    /// Creates a transport with [`Self::DEFAULT_CAPACITY`].
    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    /// Creates a transport whose channels buffer up to `capacity` messages (min 1).
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            channels: DashMap::new(),
            capacity: capacity.max(1),
        }
    }

    /// Number of receivers currently subscribed to `channel`.
    pub fn subscriber_count(&self, channel: &str) -> usize {
        self.channels
            .get(channel)
            .map_or(0, |sender| sender.receiver_count())
    }
}

impl Default for InMemoryPubSub {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PubSub for InMemoryPubSub {
    async fn publish(&self, channel: &str, payload: &str) -> Result<(), TransportError> {
        if let Some(sender) = self.channels.get(channel) {
            // no receiver left: the message is dropped
            let _ = sender.send(payload.to_string());
        }
        Ok(())
    }

    async fn subscribe(&self, channel: &str) -> Result<MessageStream, TransportError> {
        let receiver = self
            .channels
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe();

        let channel = channel.to_string();
        let messages = stream::unfold(receiver, move |mut receiver| {
            let channel = channel.clone();
            async move {
                loop {
                    match receiver.recv().await {
                        Ok(message) => return Some((message, receiver)),
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::warn!(channel = %channel, skipped, "subscriber lagged, messages dropped");
                        }
                        Err(broadcast::error::RecvError::Closed) => return None,
                    }
                }
            }
        });
        Ok(messages.boxed())
    }

    async fn unsubscribe(&self, channel: &str) -> Result<(), TransportError> {
        self.channels.remove(channel);
        Ok(())
    }
}
