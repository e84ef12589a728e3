//! Bus manager that dispatches to the configured provider.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use parley_core::config::BusConfig;
use parley_core::error::AppError;
use parley_core::result::AppResult;
use parley_core::traits::{BusStream, MessageBus};

use super::memory_pubsub::MemoryPubSub;

/// Message bus that wraps the configured provider.
#[derive(Debug, Clone)]
pub struct BusManager {
    /// The inner provider.
    inner: Arc<dyn MessageBus>,
}

impl BusManager {
    /// Create a new bus manager from configuration.
    pub async fn new(config: &BusConfig) -> AppResult<Self> {
        let inner: Arc<dyn MessageBus> = match config.provider.as_str() {
            #[cfg(feature = "redis-bus")]
            "redis" => {
                info!("Initializing Redis pub/sub bus");
                Arc::new(super::redis_pubsub::RedisPubSub::connect(&config.redis_url).await?)
            }
            "memory" => {
                info!("Initializing in-memory pub/sub bus");
                Arc::new(MemoryPubSub::new(config.buffer_size))
            }
            other => {
                return Err(AppError::configuration(format!(
                    "Unknown bus provider: '{other}'. Supported: memory, redis"
                )));
            }
        };

        Ok(Self { inner })
    }
}

#[async_trait]
impl MessageBus for BusManager {
    async fn publish(&self, topic: &str, payload: &str) -> AppResult<()> {
        self.inner.publish(topic, payload).await
    }

    async fn subscribe(&self, topic: &str) -> AppResult<BusStream> {
        self.inner.subscribe(topic).await
    }
}
