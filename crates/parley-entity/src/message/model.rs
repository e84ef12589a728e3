//! Direct message entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A persisted one-to-one message. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct DirectMessage {
    /// Unique message identifier.
    pub id: Uuid,
    /// Sending user.
    pub sender_id: Uuid,
    /// Receiving user.
    pub recipient_id: Uuid,
    /// Message text.
    pub content: String,
    /// Message time (client supplied, normalized to server clock when invalid).
    pub time_stamp: DateTime<Utc>,
    /// When the row was inserted.
    pub created_at: DateTime<Utc>,
}

/// Data required to persist a new direct message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDirectMessage {
    /// Sending user.
    pub sender_id: Uuid,
    /// Receiving user.
    pub recipient_id: Uuid,
    /// Message text.
    pub content: String,
    /// Message time.
    pub time_stamp: DateTime<Utc>,
}
