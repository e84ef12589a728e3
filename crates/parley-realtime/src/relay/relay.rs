//! Orchestrates admission, inbound events, and teardown of connections.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use parley_core::config::RealtimeConfig;
use parley_core::error::AppError;
use parley_core::result::AppResult;
use parley_database::store::{MessageStore, UserStore};
use parley_entity::message::{DirectMessage, NewDirectMessage};
use parley_entity::presence::ReachabilityRecord;
use parley_entity::user::PresenceStatus;

use crate::connection::authenticator::SessionContext;
use crate::connection::handle::ConnectionHandle;
use crate::connection::registry::ConnectionRegistry;
use crate::connection::state::ConnectionState;
use crate::message::types::{Connected, DmDelivery, DmSend, InboundEvent, OutboundEvent};
use crate::message::validator::{
    normalize_time_stamp, parse_inbound, validate_dm, validate_inbound,
};
use crate::presence::broadcaster::PresenceBroadcaster;
use crate::presence::reachability::ReachabilityDirectory;
use crate::timeout::with_timeout;

use super::router::{Delivery, DeliveryRouter};

/// Result of a successful send: the stored message and what happened to
/// the live delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendReceipt {
    /// The persisted message.
    pub message: DirectMessage,
    /// Outcome of the push attempt.
    pub delivery: Delivery,
}

/// Drives every connection of this process through its lifecycle.
#[derive(Debug)]
pub struct MessageRelay {
    users: Arc<dyn UserStore>,
    messages: Arc<dyn MessageStore>,
    registry: Arc<ConnectionRegistry>,
    reachability: ReachabilityDirectory,
    broadcaster: Arc<PresenceBroadcaster>,
    router: Arc<DeliveryRouter>,
    config: RealtimeConfig,
}

impl MessageRelay {
    /// Creates a new relay.
    pub fn new(
        users: Arc<dyn UserStore>,
        messages: Arc<dyn MessageStore>,
        registry: Arc<ConnectionRegistry>,
        reachability: ReachabilityDirectory,
        broadcaster: Arc<PresenceBroadcaster>,
        router: Arc<DeliveryRouter>,
        config: RealtimeConfig,
    ) -> Self {
        Self {
            users,
            messages,
            registry,
            reachability,
            broadcaster,
            router,
            config,
        }
    }

    /// Admits an authenticated session.
    ///
    /// Registers the connection locally and in the directory, marks the
    /// user ONLINE, queues `connected`, then announces to friends.
    /// Returns the handle and the receiving end of its outbound queue.
    pub async fn admit(
        &self,
        session: SessionContext,
    ) -> (Arc<ConnectionHandle>, mpsc::Receiver<OutboundEvent>) {
        let (tx, rx) = mpsc::channel(self.config.channel_buffer_size);
        let handle = Arc::new(ConnectionHandle::new(Arc::new(session), tx));
        let user_id = handle.user_id();
        let now = handle.session.connected_at;

        self.go_online(&handle, now).await;

        handle.send(OutboundEvent::Connected(Connected {
            socket_id: handle.id,
        }));
        self.broadcaster
            .announce(user_id, PresenceStatus::Online, now)
            .await;
        handle.advance(ConnectionState::Active);

        info!(
            conn_id = %handle.id,
            user_id = %user_id,
            instance_id = %self.router.instance_id(),
            "Connection admitted"
        );

        (handle, rx)
    }

    /// Processes one raw inbound frame. Malformed frames are logged and
    /// dropped; nothing is reported back to the client.
    pub async fn handle_frame(&self, handle: &Arc<ConnectionHandle>, raw: &str) {
        if handle.state() == ConnectionState::Disconnected {
            return;
        }
        handle.touch().await;

        let event = match validate_inbound(raw, self.config.max_frame_bytes)
            .and_then(|_| parse_inbound(raw))
        {
            Ok(event) => event,
            Err(e) => {
                warn!(conn_id = %handle.id, error = %e, "Dropping inbound frame");
                return;
            }
        };

        match event {
            InboundEvent::DmMessage(dm) => {
                match self.send_direct_message(handle.user_id(), dm).await {
                    Ok(receipt) => debug!(
                        conn_id = %handle.id,
                        message_id = %receipt.message.id,
                        delivery = ?receipt.delivery,
                        "Direct message handled"
                    ),
                    Err(e) => warn!(
                        conn_id = %handle.id,
                        user_id = %handle.user_id(),
                        error = %e,
                        "Direct message not sent"
                    ),
                }
            }
            InboundEvent::Heartbeat => self.heartbeat(handle).await,
        }
    }

    /// Resolves, persists, and pushes one direct message.
    ///
    /// Errors mean nothing was persisted. Once stored, push failures only
    /// downgrade the receipt to [`Delivery::StoredOnly`].
    pub async fn send_direct_message(&self, sender_id: Uuid, dm: DmSend) -> AppResult<SendReceipt> {
        validate_dm(&dm)?;
        let limit = self.config.operation_timeout();

        let recipient = with_timeout(limit, "recipient lookup", self.users.find_by_username(&dm.to))
            .await?
            .ok_or_else(|| AppError::not_found(format!("User '{}' not found", dm.to)))?;
        let sender = with_timeout(limit, "sender lookup", self.users.find_by_id(sender_id))
            .await?
            .ok_or_else(|| AppError::not_found(format!("Sender {sender_id} not found")))?;

        let message = with_timeout(
            limit,
            "message persist",
            self.messages.create(NewDirectMessage {
                sender_id,
                recipient_id: recipient.id,
                content: dm.content,
                time_stamp: normalize_time_stamp(dm.time_stamp.as_ref(), Utc::now()),
            }),
        )
        .await?;

        let record = match self.reachability.lookup(recipient.id).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                return Ok(SendReceipt {
                    message,
                    delivery: Delivery::StoredOnly,
                });
            }
            Err(e) => {
                warn!(recipient_id = %recipient.id, error = %e, "Recipient reachability lookup failed");
                return Ok(SendReceipt {
                    message,
                    delivery: Delivery::StoredOnly,
                });
            }
        };

        let event = OutboundEvent::DmMessage(DmDelivery::new(&sender, &message));
        let delivery = match self.router.route(recipient.id, &record, event).await {
            Ok(delivery) => delivery,
            Err(e) => {
                warn!(recipient_id = %recipient.id, error = %e, "Direct message push failed");
                Delivery::StoredOnly
            }
        };

        Ok(SendReceipt { message, delivery })
    }

    /// Refreshes last-seen and the reachability TTL.
    ///
    /// A record that lapsed while the connection stayed up is restored,
    /// unless a newer live connection of the same user holds this process.
    pub async fn heartbeat(&self, handle: &Arc<ConnectionHandle>) {
        let user_id = handle.user_id();
        let now = Utc::now();

        if let Err(e) = with_timeout(
            self.config.operation_timeout(),
            "last_seen refresh",
            self.users.touch_last_seen(user_id, now),
        )
        .await
        {
            warn!(user_id = %user_id, error = %e, "Failed to refresh last_seen");
        }

        match self.reachability.lookup(user_id).await {
            Ok(Some(record)) if record.is_connection(handle.id) => {
                if let Err(e) = self.reachability.refresh(user_id).await {
                    warn!(user_id = %user_id, error = %e, "Failed to refresh reachability TTL");
                }
            }
            Ok(Some(_)) => {
                debug!(conn_id = %handle.id, "Reachability held by a newer connection");
            }
            Ok(None) => {
                if let Some(current) = self.registry.get(user_id) {
                    if current.id != handle.id && current.is_alive() {
                        return;
                    }
                }
                info!(conn_id = %handle.id, user_id = %user_id, "Reachability lapsed, restoring");
                self.go_online(handle, now).await;
                self.broadcaster
                    .announce(user_id, PresenceStatus::Online, now)
                    .await;
                handle.advance(ConnectionState::Active);
            }
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "Reachability lookup failed on heartbeat");
            }
        }
    }

    /// Tears a connection down. Idempotent; only the first call acts.
    ///
    /// The OFFLINE transition is skipped when a newer connection of the
    /// same user has taken over. Local deregistration always runs last.
    pub async fn disconnect(&self, handle: Arc<ConnectionHandle>) {
        if !handle.begin_disconnect() {
            return;
        }
        handle.close();
        let user_id = handle.user_id();

        if self.is_current(&handle).await {
            let now = Utc::now();
            if let Err(e) = with_timeout(
                self.config.operation_timeout(),
                "status update",
                self.users.update_status(user_id, PresenceStatus::Offline, now),
            )
            .await
            {
                warn!(user_id = %user_id, error = %e, "Failed to persist OFFLINE status");
            }

            if let Err(e) = self.reachability.remove(user_id).await {
                warn!(user_id = %user_id, error = %e, "Failed to remove reachability record");
            }

            self.broadcaster
                .announce(user_id, PresenceStatus::Offline, now)
                .await;
        } else {
            info!(
                conn_id = %handle.id,
                user_id = %user_id,
                "Connection superseded, skipping OFFLINE transition"
            );
        }

        self.registry.deregister(user_id, handle.id);

        info!(conn_id = %handle.id, user_id = %user_id, "Connection disconnected");
    }

    /// Runs [`disconnect`](Self::disconnect) on its own task so teardown
    /// completes even if the caller is dropped.
    pub fn spawn_disconnect(self: &Arc<Self>, handle: Arc<ConnectionHandle>) -> JoinHandle<()> {
        let relay = Arc::clone(self);
        tokio::spawn(async move { relay.disconnect(handle).await })
    }

    async fn go_online(&self, handle: &Arc<ConnectionHandle>, at: DateTime<Utc>) {
        let user_id = handle.user_id();

        if let Some(previous) = self.registry.register(handle.clone()) {
            if previous.id != handle.id {
                info!(
                    user_id = %user_id,
                    previous = %previous.id,
                    conn_id = %handle.id,
                    "Newer connection replaces local mapping"
                );
            }
        }

        let record = ReachabilityRecord::new(self.router.instance_id(), handle.id);
        if let Err(e) = self.reachability.publish(user_id, &record).await {
            warn!(user_id = %user_id, error = %e, "Failed to publish reachability record");
        }
        handle.advance(ConnectionState::Registered);

        if let Err(e) = with_timeout(
            self.config.operation_timeout(),
            "status update",
            self.users.update_status(user_id, PresenceStatus::Online, at),
        )
        .await
        {
            warn!(user_id = %user_id, error = %e, "Failed to persist ONLINE status");
        }
    }

    async fn is_current(&self, handle: &ConnectionHandle) -> bool {
        let user_id = handle.user_id();
        if let Some(local) = self.registry.get(user_id) {
            if local.id != handle.id {
                return false;
            }
        }

        match self.reachability.lookup(user_id).await {
            Ok(Some(record)) => record.is_connection(handle.id),
            Ok(None) => true,
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "Reachability lookup failed on disconnect");
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::{DateTime, Utc};
    use serde_json::json;

    use parley_core::traits::PresenceDirectory;
    use parley_directory::keys::socket_key;

    use crate::message::types::StatusChange;
    use crate::testing::{TestBackends, drain};

    use super::*;

    fn dm(to: &str, content: &str) -> DmSend {
        DmSend {
            to: to.to_string(),
            content: content.to_string(),
            time_stamp: None,
        }
    }

    fn status_changes(events: &[OutboundEvent]) -> Vec<StatusChange> {
        events
            .iter()
            .filter_map(|event| match event {
                OutboundEvent::UserStatusChange(change) => Some(change.clone()),
                _ => None,
            })
            .collect()
    }

    fn dm_deliveries(events: &[OutboundEvent]) -> Vec<DmDelivery> {
        events
            .iter()
            .filter_map(|event| match event {
                OutboundEvent::DmMessage(delivery) => Some(delivery.clone()),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_admission_publishes_reachability() {
        let backends = TestBackends::new();
        let engine = backends.engine("node-a");
        let alice = backends.users.add_user("alice");

        let (handle, mut rx) = engine.relay.admit(SessionContext::new(alice.id)).await;

        let raw = backends
            .directory
            .get(&socket_key(alice.id))
            .await
            .unwrap()
            .unwrap();
        let record = ReachabilityRecord::decode(&raw).unwrap();
        assert_eq!(record, ReachabilityRecord::new("node-a", handle.id));

        assert_eq!(handle.state(), ConnectionState::Active);
        assert_eq!(backends.users.status_of(alice.id), Some(PresenceStatus::Online));
        assert_eq!(
            drain(&mut rx),
            vec![OutboundEvent::Connected(Connected {
                socket_id: handle.id
            })]
        );
    }

    #[tokio::test]
    async fn test_online_friend_receives_message_once() {
        let backends = TestBackends::new();
        let engine = backends.engine("node-a");
        let alice = backends.users.add_user("alice");
        let bob = backends.users.add_user("bob");
        backends.users.befriend(alice.id, bob.id);

        let (_bob_handle, mut bob_rx) = engine.relay.admit(SessionContext::new(bob.id)).await;
        let (_alice_handle, _alice_rx) = engine.relay.admit(SessionContext::new(alice.id)).await;
        drain(&mut bob_rx);

        let receipt = engine
            .relay
            .send_direct_message(
                alice.id,
                DmSend {
                    to: "bob".to_string(),
                    content: "hi".to_string(),
                    time_stamp: Some(json!("2024-05-01T10:00:00Z")),
                },
            )
            .await
            .unwrap();

        assert_eq!(receipt.delivery, Delivery::Local);
        let deliveries = dm_deliveries(&drain(&mut bob_rx));
        assert_eq!(deliveries.len(), 1);
        assert_eq!(deliveries[0].message.content, "hi");
        assert_eq!(deliveries[0].message.from, alice.id);
        assert_eq!(deliveries[0].sender_name, "Alice");
        assert_eq!(
            deliveries[0].message.time_stamp,
            "2024-05-01T10:00:00Z".parse::<DateTime<Utc>>().unwrap()
        );
        assert_eq!(backends.messages.all().await.len(), 1);
    }

    #[tokio::test]
    async fn test_unreachable_recipient_is_durable_only() {
        let backends = TestBackends::new();
        let engine = backends.engine("node-a");
        let alice = backends.users.add_user("alice");
        let bob = backends.users.add_user("bob");

        let receipt = engine
            .relay
            .send_direct_message(alice.id, dm("bob", "later"))
            .await
            .unwrap();

        assert_eq!(receipt.delivery, Delivery::StoredOnly);
        assert_eq!(receipt.message.recipient_id, bob.id);
        assert_eq!(backends.messages.all().await.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_recipient_persists_nothing() {
        let backends = TestBackends::new();
        let engine = backends.engine("node-a");
        let alice = backends.users.add_user("alice");

        let err = engine
            .relay
            .send_direct_message(alice.id, dm("nobody", "hello?"))
            .await
            .unwrap_err();

        assert_eq!(err.kind, parley_core::error::ErrorKind::NotFound);
        assert!(backends.messages.all().await.is_empty());
    }

    #[tokio::test]
    async fn test_persistence_failure_aborts_send() {
        let backends = TestBackends::new();
        let engine = backends.engine("node-a");
        let alice = backends.users.add_user("alice");
        let bob = backends.users.add_user("bob");
        let (_bob_handle, mut bob_rx) = engine.relay.admit(SessionContext::new(bob.id)).await;
        drain(&mut bob_rx);

        backends.messages.fail_writes(true);
        assert!(
            engine
                .relay
                .send_direct_message(alice.id, dm("bob", "lost"))
                .await
                .is_err()
        );
        assert!(dm_deliveries(&drain(&mut bob_rx)).is_empty());
    }

    #[tokio::test]
    async fn test_missing_time_stamp_uses_server_clock() {
        let backends = TestBackends::new();
        let engine = backends.engine("node-a");
        let alice = backends.users.add_user("alice");
        backends.users.add_user("bob");

        let before = Utc::now();
        let receipt = engine
            .relay
            .send_direct_message(alice.id, dm("bob", "now"))
            .await
            .unwrap();
        assert!(receipt.message.time_stamp >= before);
        assert!(receipt.message.time_stamp <= Utc::now());
    }

    #[tokio::test]
    async fn test_reregistration_delivers_once() {
        let backends = TestBackends::new();
        let engine = backends.engine("node-a");
        let alice = backends.users.add_user("alice");
        let bob = backends.users.add_user("bob");

        let (_old, mut old_rx) = engine.relay.admit(SessionContext::new(bob.id)).await;
        let (_new, mut new_rx) = engine.relay.admit(SessionContext::new(bob.id)).await;
        drain(&mut old_rx);
        drain(&mut new_rx);

        engine
            .relay
            .send_direct_message(alice.id, dm("bob", "once"))
            .await
            .unwrap();

        assert_eq!(engine.registry.connection_count(), 1);
        assert!(drain(&mut old_rx).is_empty());
        assert_eq!(dm_deliveries(&drain(&mut new_rx)).len(), 1);
    }

    #[tokio::test]
    async fn test_disconnect_goes_offline_and_tells_friends() {
        let backends = TestBackends::new();
        let engine = backends.engine("node-a");
        let alice = backends.users.add_user("alice");
        let bob = backends.users.add_user("bob");
        let carol = backends.users.add_user("carol");
        backends.users.befriend(alice.id, bob.id);

        let (_bob_handle, mut bob_rx) = engine.relay.admit(SessionContext::new(bob.id)).await;
        let (_carol_handle, mut carol_rx) = engine.relay.admit(SessionContext::new(carol.id)).await;
        let (alice_handle, _alice_rx) = engine.relay.admit(SessionContext::new(alice.id)).await;

        let online = status_changes(&drain(&mut bob_rx));
        assert_eq!(online.len(), 1);
        assert_eq!(online[0].user_id, alice.id);
        assert_eq!(online[0].status, PresenceStatus::Online);

        engine.relay.disconnect(alice_handle.clone()).await;

        assert_eq!(alice_handle.state(), ConnectionState::Disconnected);
        assert!(!alice_handle.is_alive());
        assert!(!engine.registry.contains(alice.id));
        assert!(
            backends
                .directory
                .get(&socket_key(alice.id))
                .await
                .unwrap()
                .is_none()
        );
        assert_eq!(backends.users.status_of(alice.id), Some(PresenceStatus::Offline));

        let offline = status_changes(&drain(&mut bob_rx));
        assert_eq!(offline.len(), 1);
        assert_eq!(offline[0].user_id, alice.id);
        assert_eq!(offline[0].status, PresenceStatus::Offline);

        assert!(status_changes(&drain(&mut carol_rx)).is_empty());
    }

    #[tokio::test]
    async fn test_disconnect_is_terminal() {
        let backends = TestBackends::new();
        let engine = backends.engine("node-a");
        let alice = backends.users.add_user("alice");
        let bob = backends.users.add_user("bob");
        backends.users.befriend(alice.id, bob.id);

        let (_alice_handle, mut alice_rx) = engine.relay.admit(SessionContext::new(alice.id)).await;
        let (bob_handle, mut bob_rx) = engine.relay.admit(SessionContext::new(bob.id)).await;
        engine.relay.disconnect(bob_handle.clone()).await;
        engine.relay.disconnect(bob_handle.clone()).await;
        drain(&mut alice_rx);

        let receipt = engine
            .relay
            .send_direct_message(alice.id, dm("bob", "gone"))
            .await
            .unwrap();
        assert_eq!(receipt.delivery, Delivery::StoredOnly);
        assert!(dm_deliveries(&drain(&mut bob_rx)).is_empty());

        engine.relay.handle_frame(&bob_handle, r#"{"event":"heartbeat"}"#).await;
        assert!(
            backends
                .directory
                .get(&socket_key(bob.id))
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_superseded_disconnect_keeps_user_online() {
        let backends = TestBackends::new();
        let engine = backends.engine("node-a");
        let alice = backends.users.add_user("alice");
        let bob = backends.users.add_user("bob");
        backends.users.befriend(alice.id, bob.id);

        let (_alice_handle, mut alice_rx) = engine.relay.admit(SessionContext::new(alice.id)).await;
        let (old_bob, _old_rx) = engine.relay.admit(SessionContext::new(bob.id)).await;
        let (new_bob, _new_rx) = engine.relay.admit(SessionContext::new(bob.id)).await;
        drain(&mut alice_rx);

        engine.relay.disconnect(old_bob).await;

        assert_eq!(backends.users.status_of(bob.id), Some(PresenceStatus::Online));
        assert_eq!(engine.registry.get(bob.id).unwrap().id, new_bob.id);
        let raw = backends
            .directory
            .get(&socket_key(bob.id))
            .await
            .unwrap()
            .unwrap();
        assert!(ReachabilityRecord::decode(&raw).unwrap().is_connection(new_bob.id));
        assert!(status_changes(&drain(&mut alice_rx)).is_empty());
    }

    #[tokio::test]
    async fn test_heartbeat_refreshes_and_restores() {
        let backends = TestBackends::new();
        let engine = backends.engine("node-a");
        let alice = backends.users.add_user("alice");

        let (handle, _rx) = engine.relay.admit(SessionContext::new(alice.id)).await;
        engine.relay.handle_frame(&handle, r#"{"event":"heartbeat"}"#).await;
        assert!(backends.users.last_seen_of(alice.id).is_some());

        backends.directory.delete(&socket_key(alice.id)).await.unwrap();
        engine.relay.heartbeat(&handle).await;

        let raw = backends
            .directory
            .get(&socket_key(alice.id))
            .await
            .unwrap()
            .unwrap();
        assert!(ReachabilityRecord::decode(&raw).unwrap().is_connection(handle.id));
    }

    #[tokio::test]
    async fn test_malformed_frame_is_dropped() {
        let backends = TestBackends::new();
        let engine = backends.engine("node-a");
        let alice = backends.users.add_user("alice");
        backends.users.add_user("bob");

        let (handle, mut rx) = engine.relay.admit(SessionContext::new(alice.id)).await;
        drain(&mut rx);

        engine.relay.handle_frame(&handle, "not json").await;
        engine
            .relay
            .handle_frame(&handle, r#"{"event":"dm_message","data":{"content":"no recipient"}}"#)
            .await;

        assert!(drain(&mut rx).is_empty());
        assert!(backends.messages.all().await.is_empty());
        assert_eq!(handle.state(), ConnectionState::Active);
    }

    #[tokio::test]
    async fn test_announced_last_seen_matches_stored() {
        let backends = TestBackends::new();
        let engine = backends.engine("node-a");
        let alice = backends.users.add_user("alice");
        let bob = backends.users.add_user("bob");
        backends.users.befriend(alice.id, bob.id);

        let (_bob_handle, mut bob_rx) = engine.relay.admit(SessionContext::new(bob.id)).await;
        drain(&mut bob_rx);
        let session = SessionContext::new(alice.id);
        let connected_at = session.connected_at;
        let (_alice_handle, _alice_rx) = engine.relay.admit(session).await;

        let changes = status_changes(&drain(&mut bob_rx));
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].last_seen, connected_at);
        assert_eq!(backends.users.last_seen_of(alice.id), Some(connected_at));
    }

    #[tokio::test]
    async fn test_reachability_record_lives_for_configured_ttl() {
        let backends = TestBackends::new();
        let mut config = crate::testing::test_config("node-a");
        config.directory.reachability_ttl_seconds = 1;
        let engine = backends.engine_with(&config);
        let alice = backends.users.add_user("alice");
        let key = socket_key(alice.id);

        let (_handle, _rx) = engine.relay.admit(SessionContext::new(alice.id)).await;
        assert_eq!(backends.directory.last_ttl(&key), Some(Duration::from_secs(1)));

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert!(backends.directory.get(&key).await.unwrap().is_some());

        tokio::time::sleep(Duration::from_millis(900)).await;
        assert!(backends.directory.get(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_nul_content_is_rejected_before_persisting() {
        let backends = TestBackends::new();
        let engine = backends.engine("node-a");
        let alice = backends.users.add_user("alice");
        let bob = backends.users.add_user("bob");
        let (_bob_handle, mut bob_rx) = engine.relay.admit(SessionContext::new(bob.id)).await;
        let (alice_handle, _alice_rx) = engine.relay.admit(SessionContext::new(alice.id)).await;
        drain(&mut bob_rx);

        let err = engine
            .relay
            .send_direct_message(alice.id, dm("bob", "a\u{0}b"))
            .await
            .unwrap_err();
        assert_eq!(err.kind, parley_core::error::ErrorKind::Validation);

        let frame = json!({
            "event": "dm_message",
            "data": { "to": "bob", "content": "x\u{0}y" }
        })
        .to_string();
        engine.relay.handle_frame(&alice_handle, &frame).await;

        assert!(backends.messages.all().await.is_empty());
        assert!(dm_deliveries(&drain(&mut bob_rx)).is_empty());
        assert_eq!(alice_handle.state(), ConnectionState::Active);
    }

    #[tokio::test]
    async fn test_spawned_disconnect_completes() {
        let backends = TestBackends::new();
        let engine = backends.engine("node-a");
        let alice = backends.users.add_user("alice");
        let (handle, rx) = engine.relay.admit(SessionContext::new(alice.id)).await;
        drop(rx);

        tokio::time::timeout(Duration::from_secs(1), engine.relay.spawn_disconnect(handle))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(backends.users.status_of(alice.id), Some(PresenceStatus::Offline));
    }
}
