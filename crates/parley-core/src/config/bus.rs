//! Publish/subscribe bus configuration.

use serde::{Deserialize, Serialize};

/// Bus transport configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusConfig {
    /// Bus provider type: `"memory"` or `"redis"`.
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Redis connection URL used when `provider = "redis"`.
    #[serde(default = "default_redis_url")]
    pub redis_url: String,
    /// Topic carrying direct-message deliveries.
    #[serde(default = "default_dm_topic")]
    pub dm_topic: String,
    /// Per-topic buffer of the in-memory bus.
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            redis_url: default_redis_url(),
            dm_topic: default_dm_topic(),
            buffer_size: default_buffer_size(),
        }
    }
}

fn default_provider() -> String {
    "memory".to_string()
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_dm_topic() -> String {
    "parley:dm".to_string()
}

fn default_buffer_size() -> usize {
    1024
}
