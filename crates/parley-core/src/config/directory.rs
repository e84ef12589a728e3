//! Presence directory configuration.

use serde::{Deserialize, Serialize};

/// Top-level presence directory configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryConfig {
    /// Directory provider type: `"memory"` or `"redis"`.
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Lifetime of a reachability record in seconds.
    #[serde(default = "default_reachability_ttl")]
    pub reachability_ttl_seconds: u64,
    /// Redis-specific configuration.
    #[serde(default)]
    pub redis: RedisDirectoryConfig,
    /// In-memory configuration.
    #[serde(default)]
    pub memory: MemoryDirectoryConfig,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            reachability_ttl_seconds: default_reachability_ttl(),
            redis: RedisDirectoryConfig::default(),
            memory: MemoryDirectoryConfig::default(),
        }
    }
}

/// Redis directory backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisDirectoryConfig {
    /// Redis connection URL.
    #[serde(default = "default_redis_url")]
    pub url: String,
    /// Key prefix for all Parley directory keys.
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
}

impl Default for RedisDirectoryConfig {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
            key_prefix: default_key_prefix(),
        }
    }
}

/// In-memory directory backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryDirectoryConfig {
    /// Maximum number of entries held.
    #[serde(default = "default_max_capacity")]
    pub max_capacity: u64,
}

impl Default for MemoryDirectoryConfig {
    fn default() -> Self {
        Self {
            max_capacity: default_max_capacity(),
        }
    }
}

fn default_provider() -> String {
    "memory".to_string()
}

fn default_reachability_ttl() -> u64 {
    60 * 10
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_key_prefix() -> String {
    "parley:".to_string()
}

fn default_max_capacity() -> u64 {
    100_000
}
