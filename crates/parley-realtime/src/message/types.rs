//! Inbound and outbound WebSocket event definitions.
//!
//! Every frame is a JSON object `{ "event": <name>, "data": <payload> }`.
//! Payload field names are camelCase on the wire.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use parley_entity::message::DirectMessage;
use parley_entity::user::{PresenceStatus, User};

/// Events sent by the client to the server.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    /// Send a direct message to another user.
    DmMessage(DmSend),
    /// Liveness signal. Carries no payload.
    Heartbeat,
}

/// Payload of an inbound `dm_message`.
///
/// Extra fields sent by older clients (`from`, `message`) are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct DmSend {
    /// Recipient username.
    #[validate(length(min = 1, message = "recipient username must not be empty"))]
    pub to: String,
    /// Message text. Length is not constrained; NUL is rejected.
    pub content: String,
    /// Client time stamp. Normalized to the server clock when absent or
    /// not RFC 3339.
    #[serde(default, rename = "timeStamp", alias = "timestamp")]
    pub time_stamp: Option<serde_json::Value>,
}

/// Events sent by the server to the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum OutboundEvent {
    /// Admission confirmed.
    Connected(Connected),
    /// A direct message addressed to this user.
    DmMessage(DmDelivery),
    /// A friend's presence changed.
    UserStatusChange(StatusChange),
}

impl OutboundEvent {
    /// Wire name of the event.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Connected(_) => "connected",
            Self::DmMessage(_) => "dm_message",
            Self::UserStatusChange(_) => "user_status_change",
        }
    }
}

/// Payload of `connected`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connected {
    /// Connection handle assigned to this stream.
    pub socket_id: Uuid,
}

/// Payload of an outbound `dm_message`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DmDelivery {
    /// Sender id.
    pub from: Uuid,
    /// Recipient id.
    pub to: Uuid,
    /// Sender display name.
    pub sender_name: String,
    /// Sender avatar URL.
    pub sender_avatar: Option<String>,
    /// The stored message.
    pub message: DmBody,
}

/// Stored message as shown to the recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DmBody {
    /// Message id.
    pub id: Uuid,
    /// Message text.
    pub content: String,
    /// Sender id.
    pub from: Uuid,
    /// Recipient id.
    pub to: Uuid,
    /// Message time stamp.
    pub time_stamp: DateTime<Utc>,
}

impl DmDelivery {
    /// Build the delivery event for a persisted message.
    pub fn new(sender: &User, message: &DirectMessage) -> Self {
        Self {
            from: message.sender_id,
            to: message.recipient_id,
            sender_name: sender.name.clone(),
            sender_avatar: sender.avatar.clone(),
            message: DmBody {
                id: message.id,
                content: message.content.clone(),
                from: message.sender_id,
                to: message.recipient_id,
                time_stamp: message.time_stamp,
            },
        }
    }
}

/// Payload of `user_status_change`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChange {
    /// User whose status changed.
    pub user_id: Uuid,
    /// New status.
    pub status: PresenceStatus,
    /// Time of the change.
    pub last_seen: DateTime<Utc>,
}
