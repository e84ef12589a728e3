//! Response DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use parley_entity::message::DirectMessage;

/// Standard success response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T: Serialize> {
    /// Whether the request was successful.
    pub success: bool,
    /// Response data.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Creates a successful response.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// One message of a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageResponse {
    /// Message id.
    pub id: Uuid,
    /// Sender id.
    pub from: Uuid,
    /// Recipient id.
    pub to: Uuid,
    /// Message text.
    pub content: String,
    /// Message time stamp.
    pub time_stamp: DateTime<Utc>,
}

impl From<DirectMessage> for MessageResponse {
    fn from(message: DirectMessage) -> Self {
        Self {
            id: message.id,
            from: message.sender_id,
            to: message.recipient_id,
            content: message.content,
            time_stamp: message.time_stamp,
        }
    }
}

/// Liveness response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always `"ok"`.
    pub status: String,
    /// Crate version.
    pub version: String,
}

/// Detailed health response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetailedHealthResponse {
    /// `"ok"` or `"degraded"`.
    pub status: String,
    /// This process instance.
    pub instance_id: String,
    /// Durable store reachability.
    pub database: String,
    /// Directory reachability.
    pub directory: String,
    /// Live local connections.
    pub connections: usize,
}
