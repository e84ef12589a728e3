//! Publish/subscribe bus providers.

pub mod memory_pubsub;
pub mod provider;
#[cfg(feature = "redis-bus")]
pub mod redis_pubsub;

pub use memory_pubsub::MemoryPubSub;
pub use provider::BusManager;
