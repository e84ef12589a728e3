//! Reachability record stored in the presence directory.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Locator of a user's live connection: which process holds it and
/// which connection handle inside that process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReachabilityRecord {
    /// Process instance holding the transport socket.
    pub instance_id: String,
    /// Connection handle inside that process.
    pub connection_id: Uuid,
}

impl ReachabilityRecord {
    /// Create a new record.
    pub fn new(instance_id: impl Into<String>, connection_id: Uuid) -> Self {
        Self {
            instance_id: instance_id.into(),
            connection_id,
        }
    }

    /// Encode for storage in the directory.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Decode a directory value.
    pub fn decode(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// Whether the record points at the given connection.
    pub fn is_connection(&self, connection_id: Uuid) -> bool {
        self.connection_id == connection_id
    }
}
