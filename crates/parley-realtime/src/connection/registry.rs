//! Connection registry: the in-process table of live connections.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;
use uuid::Uuid;

use crate::message::types::OutboundEvent;

use super::handle::{ConnectionHandle, ConnectionId};

/// Thread-safe map of user id to that user's live local connection.
///
/// At most one handle per user; a newer connection replaces the older one.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    /// User ID → connection handle.
    by_user: DashMap<Uuid, Arc<ConnectionHandle>>,
}

impl ConnectionRegistry {
    /// Creates a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `handle` the user's local connection, returning the one it replaced.
    pub fn register(&self, handle: Arc<ConnectionHandle>) -> Option<Arc<ConnectionHandle>> {
        let replaced = self.by_user.insert(handle.user_id(), handle.clone());
        debug!(
            user_id = %handle.user_id(),
            conn_id = %handle.id,
            replaced = ?replaced.as_ref().map(|h| h.id),
            "Connection registered"
        );
        replaced
    }

    /// Removes the user's mapping only if it still points at `conn_id`.
    pub fn deregister(&self, user_id: Uuid, conn_id: ConnectionId) -> bool {
        self.by_user
            .remove_if(&user_id, |_, handle| handle.id == conn_id)
            .is_some()
    }

    /// Delivers an event to the user's local connection. Returns whether
    /// the event was queued.
    pub fn send(&self, user_id: Uuid, event: OutboundEvent) -> bool {
        match self.get(user_id) {
            Some(handle) => handle.send(event),
            None => false,
        }
    }

    /// The user's local connection, if any.
    pub fn get(&self, user_id: Uuid) -> Option<Arc<ConnectionHandle>> {
        self.by_user.get(&user_id).map(|entry| entry.value().clone())
    }

    /// Whether the user holds a connection on this process.
    pub fn contains(&self, user_id: Uuid) -> bool {
        self.by_user.contains_key(&user_id)
    }

    /// Number of live local connections.
    pub fn connection_count(&self) -> usize {
        self.by_user.len()
    }

    /// Signals every connection to close.
    pub fn close_all(&self) {
        for entry in self.by_user.iter() {
            entry.value().close();
        }
    }
}
