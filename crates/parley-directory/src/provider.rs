//! Directory manager that dispatches to the configured provider.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

use parley_core::config::DirectoryConfig;
use parley_core::error::AppError;
use parley_core::result::AppResult;
use parley_core::traits::PresenceDirectory;

/// Presence directory that wraps the configured provider.
///
/// The provider is selected at construction time based on configuration.
#[derive(Debug, Clone)]
pub struct DirectoryManager {
    /// The inner provider.
    inner: Arc<dyn PresenceDirectory>,
}

impl DirectoryManager {
    /// Create a new directory manager from configuration.
    pub async fn new(config: &DirectoryConfig) -> AppResult<Self> {
        let inner: Arc<dyn PresenceDirectory> = match config.provider.as_str() {
            #[cfg(feature = "redis-backend")]
            "redis" => {
                info!("Initializing Redis presence directory");
                let client = crate::redis::RedisClient::connect(&config.redis).await?;
                Arc::new(crate::redis::RedisDirectory::new(client))
            }
            #[cfg(feature = "memory")]
            "memory" => {
                info!("Initializing in-memory presence directory");
                Arc::new(crate::memory::MemoryDirectory::new(&config.memory))
            }
            other => {
                return Err(AppError::configuration(format!(
                    "Unknown directory provider: '{other}'. Supported: memory, redis"
                )));
            }
        };

        Ok(Self { inner })
    }
}

#[async_trait]
impl PresenceDirectory for DirectoryManager {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> AppResult<()> {
        self.inner.set(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.inner.delete(key).await
    }

    async fn expire(&self, key: &str, ttl: Duration) -> AppResult<bool> {
        self.inner.expire(key, ttl).await
    }

    async fn health_check(&self) -> AppResult<bool> {
        self.inner.health_check().await
    }
}
