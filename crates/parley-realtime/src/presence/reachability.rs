//! Typed access to reachability records in the presence directory.

use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use parley_core::result::AppResult;
use parley_core::traits::PresenceDirectory;
use parley_directory::keys::socket_key;
use parley_entity::presence::ReachabilityRecord;

use crate::timeout::with_timeout;

/// Reads and writes `socket:{user_id}` records with deadlines applied.
#[derive(Debug, Clone)]
pub struct ReachabilityDirectory {
    /// Shared directory backend.
    directory: Arc<dyn PresenceDirectory>,
    /// Lifetime of a record without refresh.
    ttl: Duration,
    /// Deadline for each directory call.
    op_timeout: Duration,
}

impl ReachabilityDirectory {
    /// Creates a new reachability directory.
    pub fn new(directory: Arc<dyn PresenceDirectory>, ttl: Duration, op_timeout: Duration) -> Self {
        Self {
            directory,
            ttl,
            op_timeout,
        }
    }

    /// Publishes the user's record, replacing any previous one.
    pub async fn publish(&self, user_id: Uuid, record: &ReachabilityRecord) -> AppResult<()> {
        let value = record.encode()?;
        with_timeout(
            self.op_timeout,
            "directory set",
            self.directory.set(&socket_key(user_id), &value, self.ttl),
        )
        .await
    }

    /// Looks up the user's record. `None` means unreachable for push.
    pub async fn lookup(&self, user_id: Uuid) -> AppResult<Option<ReachabilityRecord>> {
        let raw = with_timeout(
            self.op_timeout,
            "directory get",
            self.directory.get(&socket_key(user_id)),
        )
        .await?;

        match raw {
            Some(value) => Ok(Some(ReachabilityRecord::decode(&value)?)),
            None => Ok(None),
        }
    }

    /// Resets the record's TTL. Returns `false` when no record exists.
    pub async fn refresh(&self, user_id: Uuid) -> AppResult<bool> {
        with_timeout(
            self.op_timeout,
            "directory expire",
            self.directory.expire(&socket_key(user_id), self.ttl),
        )
        .await
    }

    /// Removes the user's record.
    pub async fn remove(&self, user_id: Uuid) -> AppResult<()> {
        with_timeout(
            self.op_timeout,
            "directory delete",
            self.directory.delete(&socket_key(user_id)),
        )
        .await
    }
}
