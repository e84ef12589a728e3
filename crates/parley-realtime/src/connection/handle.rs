//! Individual connection handle.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

use tokio::sync::{RwLock, mpsc};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::message::types::OutboundEvent;

use super::authenticator::SessionContext;
use super::state::ConnectionState;

/// Unique connection identifier
pub type ConnectionId = Uuid;

/// A handle to a single live connection.
///
/// Holds the bounded sender that feeds the connection's outbound
/// forwarder, plus the session it was admitted with.
#[derive(Debug)]
pub struct ConnectionHandle {
    /// Connection ID (same as the session's connection id)
    pub id: ConnectionId,
    /// Immutable session context
    pub session: Arc<SessionContext>,
    /// Sender for outbound events
    sender: mpsc::Sender<OutboundEvent>,
    /// Last inbound activity
    last_activity: RwLock<Instant>,
    /// Lifecycle state
    state: AtomicU8,
    /// Cancelled when the connection must close
    cancel: CancellationToken,
}

impl ConnectionHandle {
    /// Create a new handle for an authenticated session.
    pub fn new(session: Arc<SessionContext>, sender: mpsc::Sender<OutboundEvent>) -> Self {
        Self {
            id: session.connection_id,
            session,
            sender,
            last_activity: RwLock::new(Instant::now()),
            state: AtomicU8::new(ConnectionState::Authenticated as u8),
            cancel: CancellationToken::new(),
        }
    }

    /// Owning user.
    pub fn user_id(&self) -> Uuid {
        self.session.user_id
    }

    /// Queue an event for this connection.
    ///
    /// Never blocks: a full queue drops the event, a closed queue marks
    /// the connection for shutdown.
    pub fn send(&self, event: OutboundEvent) -> bool {
        if !self.is_alive() {
            return false;
        }
        match self.sender.try_send(event) {
            Ok(_) => true,
            Err(mpsc::error::TrySendError::Full(event)) => {
                tracing::warn!(
                    conn_id = %self.id,
                    event = event.name(),
                    "Connection send buffer full, dropping event"
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.close();
                false
            }
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// Advance to `next` unless already disconnected.
    pub fn advance(&self, next: ConnectionState) {
        let _ = self
            .state
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                (current != ConnectionState::Disconnected as u8).then_some(next as u8)
            });
    }

    /// Enter the terminal state. Returns `false` if it was already entered.
    pub fn begin_disconnect(&self) -> bool {
        self.state
            .swap(ConnectionState::Disconnected as u8, Ordering::SeqCst)
            != ConnectionState::Disconnected as u8
    }

    /// Whether the connection still accepts events.
    pub fn is_alive(&self) -> bool {
        !self.cancel.is_cancelled()
    }

    /// Signal the transport to close.
    pub fn close(&self) {
        self.cancel.cancel();
    }

    /// Token cancelled when the connection closes.
    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Record inbound activity.
    pub async fn touch(&self) {
        *self.last_activity.write().await = Instant::now();
    }

    /// Time since the last inbound activity.
    pub async fn idle_for(&self) -> Duration {
        self.last_activity.read().await.elapsed()
    }
}
