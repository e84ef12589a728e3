//! Publish/subscribe bus trait.

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::result::AppResult;

/// Stream of raw payloads received on one topic.
pub type BusStream = BoxStream<'static, String>;

/// A topic-based broadcast transport shared by all process instances.
///
/// Every subscriber on every instance receives each published payload at
/// most once. Ordering is preserved per publisher and topic only.
#[async_trait]
pub trait MessageBus: Send + Sync + std::fmt::Debug + 'static {
    /// Publish a serialized payload to a topic.
    async fn publish(&self, topic: &str, payload: &str) -> AppResult<()>;

    /// Subscribe to a topic.
    ///
    /// The stream ends when the bus shuts down or the underlying transport
    /// connection is lost. Long-lived consumers subscribe again.
    async fn subscribe(&self, topic: &str) -> AppResult<BusStream>;
}
