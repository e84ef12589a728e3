//! Bus envelope addressing an event to one process instance.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::types::OutboundEvent;

/// An outbound event in transit between process instances.
///
/// Every instance subscribed to the topic receives the envelope; only
/// the one named by `target_instance` delivers it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryEnvelope {
    /// Instance holding the recipient's connection.
    pub target_instance: String,
    /// Recipient user.
    pub recipient_id: Uuid,
    /// The event to deliver.
    pub event: OutboundEvent,
}

impl DeliveryEnvelope {
    /// Create a new envelope.
    pub fn new(target_instance: impl Into<String>, recipient_id: Uuid, event: OutboundEvent) -> Self {
        Self {
            target_instance: target_instance.into(),
            recipient_id,
            event,
        }
    }

    /// Whether this envelope should be delivered by `instance_id`.
    pub fn is_addressed_to(&self, instance_id: &str) -> bool {
        self.target_instance == instance_id
    }
}
