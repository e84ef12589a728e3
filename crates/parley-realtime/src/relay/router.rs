//! Delivery routing: local registry dispatch or hand-off to the owning
//! instance over the bus.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};
use uuid::Uuid;

use parley_core::result::AppResult;
use parley_core::traits::MessageBus;
use parley_entity::presence::ReachabilityRecord;

use crate::connection::registry::ConnectionRegistry;
use crate::message::envelope::DeliveryEnvelope;
use crate::message::types::OutboundEvent;
use crate::timeout::with_timeout;

/// What happened to an event handed to the router.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Queued on a connection held by this instance.
    Local,
    /// Published to the owning instance's topic.
    Published,
    /// No live connection could take it; durable state only.
    StoredOnly,
}

/// Routes outbound events to the instance holding the recipient.
///
/// Each instance listens on its own topic, `{base_topic}:{instance_id}`,
/// so a delivery wakes exactly one process.
#[derive(Debug)]
pub struct DeliveryRouter {
    /// This process instance.
    instance_id: String,
    /// Local connections.
    registry: Arc<ConnectionRegistry>,
    /// Shared bus.
    bus: Arc<dyn MessageBus>,
    /// Topic prefix for deliveries.
    base_topic: String,
    /// Deadline for bus calls.
    op_timeout: Duration,
}

impl DeliveryRouter {
    /// Creates a new router.
    pub fn new(
        instance_id: impl Into<String>,
        registry: Arc<ConnectionRegistry>,
        bus: Arc<dyn MessageBus>,
        base_topic: impl Into<String>,
        op_timeout: Duration,
    ) -> Self {
        Self {
            instance_id: instance_id.into(),
            registry,
            bus,
            base_topic: base_topic.into(),
            op_timeout,
        }
    }

    /// This process instance.
    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// Delivery topic of an instance.
    pub fn topic_for(&self, instance_id: &str) -> String {
        format!("{}:{instance_id}", self.base_topic)
    }

    /// Topic this instance subscribes to.
    pub fn inbox_topic(&self) -> String {
        self.topic_for(&self.instance_id)
    }

    /// Sends `event` to `recipient_id` at the location named by `record`.
    pub async fn route(
        &self,
        recipient_id: Uuid,
        record: &ReachabilityRecord,
        event: OutboundEvent,
    ) -> AppResult<Delivery> {
        if record.instance_id == self.instance_id {
            return Ok(self.deliver_local(recipient_id, event));
        }

        let envelope = DeliveryEnvelope::new(record.instance_id.clone(), recipient_id, event);
        let payload = serde_json::to_string(&envelope)?;
        let topic = self.topic_for(&record.instance_id);
        with_timeout(self.op_timeout, "bus publish", self.bus.publish(&topic, &payload)).await?;

        debug!(
            recipient_id = %recipient_id,
            target_instance = %record.instance_id,
            "Event published to owning instance"
        );
        Ok(Delivery::Published)
    }

    /// Handles one payload received on this instance's topic.
    pub fn accept(&self, payload: &str) -> Delivery {
        let envelope: DeliveryEnvelope = match serde_json::from_str(payload) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(error = %e, "Skipping malformed bus envelope");
                return Delivery::StoredOnly;
            }
        };

        if !envelope.is_addressed_to(&self.instance_id) {
            debug!(
                target_instance = %envelope.target_instance,
                "Ignoring envelope addressed to another instance"
            );
            return Delivery::StoredOnly;
        }

        self.deliver_local(envelope.recipient_id, envelope.event)
    }

    fn deliver_local(&self, recipient_id: Uuid, event: OutboundEvent) -> Delivery {
        if self.registry.send(recipient_id, event) {
            Delivery::Local
        } else {
            debug!(recipient_id = %recipient_id, "Recipient not connected here, dropping");
            Delivery::StoredOnly
        }
    }
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;
    use tokio::sync::mpsc;

    use crate::bridge::memory_pubsub::MemoryPubSub;
    use crate::connection::authenticator::SessionContext;
    use crate::connection::handle::ConnectionHandle;
    use crate::message::types::Connected;

    use super::*;

    fn router(instance: &str, bus: Arc<MemoryPubSub>) -> (DeliveryRouter, Arc<ConnectionRegistry>) {
        let registry = Arc::new(ConnectionRegistry::new());
        (
            DeliveryRouter::new(
                instance,
                registry.clone(),
                bus,
                "parley:dm",
                Duration::from_secs(1),
            ),
            registry,
        )
    }

    fn connect(registry: &ConnectionRegistry, user: Uuid) -> mpsc::Receiver<OutboundEvent> {
        let (tx, rx) = mpsc::channel(8);
        let handle = ConnectionHandle::new(Arc::new(SessionContext::new(user)), tx);
        registry.register(Arc::new(handle));
        rx
    }

    fn event() -> OutboundEvent {
        OutboundEvent::Connected(Connected {
            socket_id: Uuid::new_v4(),
        })
    }

    #[tokio::test]
    async fn test_local_record_dispatches_directly() {
        let bus = Arc::new(MemoryPubSub::new(8));
        let (router, registry) = router("node-a", bus.clone());
        let mut inbox = bus.subscribe(&router.inbox_topic()).await.unwrap();
        let user = Uuid::new_v4();
        let mut rx = connect(&registry, user);

        let record = ReachabilityRecord::new("node-a", Uuid::new_v4());
        let delivery = router.route(user, &record, event()).await.unwrap();

        assert_eq!(delivery, Delivery::Local);
        assert!(rx.try_recv().is_ok());

        bus.publish(&router.inbox_topic(), "marker").await.unwrap();
        assert_eq!(inbox.next().await.as_deref(), Some("marker"));
    }

    #[tokio::test]
    async fn test_remote_record_publishes_to_owner() {
        let bus = Arc::new(MemoryPubSub::new(8));
        let (router_a, _) = router("node-a", bus.clone());
        let (router_b, registry_b) = router("node-b", bus.clone());
        let mut inbox_b = bus.subscribe(&router_b.inbox_topic()).await.unwrap();

        let user = Uuid::new_v4();
        let mut rx = connect(&registry_b, user);
        let record = ReachabilityRecord::new("node-b", Uuid::new_v4());

        assert_eq!(
            router_a.route(user, &record, event()).await.unwrap(),
            Delivery::Published
        );

        let payload = inbox_b.next().await.unwrap();
        assert_eq!(router_b.accept(&payload), Delivery::Local);
        assert!(rx.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_accept_filters_and_tolerates_garbage() {
        let bus = Arc::new(MemoryPubSub::new(8));
        let (router, registry) = router("node-a", bus);
        let user = Uuid::new_v4();
        let mut rx = connect(&registry, user);

        let foreign = serde_json::to_string(&DeliveryEnvelope::new("node-z", user, event())).unwrap();
        assert_eq!(router.accept(&foreign), Delivery::StoredOnly);
        assert_eq!(router.accept("{not json"), Delivery::StoredOnly);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_local_record_without_connection() {
        let bus = Arc::new(MemoryPubSub::new(8));
        let (router, _) = router("node-a", bus);
        let record = ReachabilityRecord::new("node-a", Uuid::new_v4());
        assert_eq!(
            router.route(Uuid::new_v4(), &record, event()).await.unwrap(),
            Delivery::StoredOnly
        );
    }
}
