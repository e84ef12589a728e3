//! In-memory pub/sub for single-node deployments and tests.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

use parley_core::result::AppResult;
use parley_core::traits::{BusStream, MessageBus};

/// In-memory pub/sub implementation.
///
/// Cloning an `Arc<MemoryPubSub>` into several engines simulates several
/// process instances sharing one bus.
#[derive(Debug)]
pub struct MemoryPubSub {
    /// Topic name → broadcast sender
    topics: RwLock<HashMap<String, broadcast::Sender<String>>>,
    /// Buffer size for topics
    buffer_size: usize,
}

impl MemoryPubSub {
    /// Create a new in-memory pub/sub
    pub fn new(buffer_size: usize) -> Self {
        Self {
            topics: RwLock::new(HashMap::new()),
            buffer_size,
        }
    }
}

#[async_trait]
impl MessageBus for MemoryPubSub {
    async fn publish(&self, topic: &str, payload: &str) -> AppResult<()> {
        let topics = self.topics.read().await;
        if let Some(tx) = topics.get(topic) {
            // No live subscribers is not an error
            let _ = tx.send(payload.to_string());
        }
        Ok(())
    }

    async fn subscribe(&self, topic: &str) -> AppResult<BusStream> {
        let rx = {
            let mut topics = self.topics.write().await;
            topics
                .entry(topic.to_string())
                .or_insert_with(|| broadcast::channel(self.buffer_size).0)
                .subscribe()
        };

        let topic = topic.to_string();
        let stream = futures::stream::unfold(rx, move |mut rx| {
            let topic = topic.clone();
            async move {
                loop {
                    match rx.recv().await {
                        Ok(payload) => return Some((payload, rx)),
                        Err(RecvError::Lagged(skipped)) => {
                            tracing::warn!(topic = %topic, skipped, "Bus subscriber lagged");
                        }
                        Err(RecvError::Closed) => return None,
                    }
                }
            }
        });

        Ok(Box::pin(stream))
    }
}
