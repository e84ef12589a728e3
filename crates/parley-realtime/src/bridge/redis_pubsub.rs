//! Redis pub/sub bridge for multi-node deployments.

use async_trait::async_trait;
use futures::StreamExt;
use redis::aio::ConnectionManager;
use tracing::{info, warn};

use parley_core::error::{AppError, ErrorKind};
use parley_core::result::AppResult;
use parley_core::traits::{BusStream, MessageBus};
use parley_directory::redis::client::mask_redis_url;

/// Redis pub/sub bridge for cross-node event relay.
///
/// Publishing shares one reconnecting connection; every subscription
/// opens its own dedicated pub/sub connection.
#[derive(Clone)]
pub struct RedisPubSub {
    /// Client used to open subscriber connections.
    client: redis::Client,
    /// Multiplexed connection used for PUBLISH.
    publisher: ConnectionManager,
}

impl std::fmt::Debug for RedisPubSub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisPubSub").finish()
    }
}

impl RedisPubSub {
    /// Connects to Redis.
    pub async fn connect(url: &str) -> AppResult<Self> {
        info!(url = %mask_redis_url(url), "Connecting Redis pub/sub bus");

        let client = redis::Client::open(url)
            .map_err(|e| AppError::with_source(ErrorKind::Bus, "Failed to create Redis client", e))?;
        let publisher = ConnectionManager::new(client.clone())
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Bus, "Redis connection failed", e))?;

        Ok(Self { client, publisher })
    }
}

#[async_trait]
impl MessageBus for RedisPubSub {
    async fn publish(&self, topic: &str, payload: &str) -> AppResult<()> {
        let mut conn = self.publisher.clone();
        redis::cmd("PUBLISH")
            .arg(topic)
            .arg(payload)
            .query_async::<i64>(&mut conn)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Bus, "Redis PUBLISH failed", e))?;
        Ok(())
    }

    async fn subscribe(&self, topic: &str) -> AppResult<BusStream> {
        let mut pubsub = self
            .client
            .get_async_pubsub()
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Bus, "Redis pub/sub connection failed", e))?;
        pubsub
            .subscribe(topic)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Bus, "Redis SUBSCRIBE failed", e))?;

        info!(topic = %topic, "Subscribed to Redis topic");

        let stream = pubsub.into_on_message().filter_map(|msg| {
            let payload = match msg.get_payload::<String>() {
                Ok(payload) => Some(payload),
                Err(e) => {
                    warn!(error = %e, "Dropping non-text Redis payload");
                    None
                }
            };
            futures::future::ready(payload)
        });

        Ok(Box::pin(stream))
    }
}
