//! Top-level real-time engine that ties together all subsystems.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::info;
use uuid::Uuid;

use parley_auth::jwt::JwtDecoder;
use parley_core::config::{AppConfig, RealtimeConfig};
use parley_core::result::AppResult;
use parley_core::traits::{MessageBus, PresenceDirectory};
use parley_database::store::{MessageStore, UserStore};

use crate::connection::authenticator::SessionAuthenticator;
use crate::connection::heartbeat::HeartbeatConfig;
use crate::connection::registry::ConnectionRegistry;
use crate::presence::broadcaster::PresenceBroadcaster;
use crate::presence::reachability::ReachabilityDirectory;
use crate::relay::relay::MessageRelay;
use crate::relay::router::DeliveryRouter;
use crate::relay::subscriber::run_subscriber;

/// External collaborators the engine is built on.
#[derive(Debug, Clone)]
pub struct EngineDependencies {
    /// Durable users and friend graph.
    pub users: Arc<dyn UserStore>,
    /// Durable direct messages.
    pub messages: Arc<dyn MessageStore>,
    /// Shared presence directory.
    pub directory: Arc<dyn PresenceDirectory>,
    /// Shared pub/sub bus.
    pub bus: Arc<dyn MessageBus>,
}

/// Central real-time engine for one process instance.
#[derive(Clone)]
pub struct RealtimeEngine {
    /// Identifier of this process instance.
    pub instance_id: String,
    /// Handshake authenticator.
    pub authenticator: Arc<SessionAuthenticator>,
    /// Local connections.
    pub registry: Arc<ConnectionRegistry>,
    /// Presence fan-out.
    pub broadcaster: Arc<PresenceBroadcaster>,
    /// Connection state machine and send path.
    pub relay: Arc<MessageRelay>,
    /// Local or cross-instance delivery.
    pub router: Arc<DeliveryRouter>,
    /// Shared presence directory.
    directory: Arc<dyn PresenceDirectory>,
    /// Shared pub/sub bus.
    bus: Arc<dyn MessageBus>,
    /// Configuration.
    config: RealtimeConfig,
    /// Shutdown signal sender.
    shutdown_tx: broadcast::Sender<()>,
}

impl std::fmt::Debug for RealtimeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeEngine")
            .field("instance_id", &self.instance_id)
            .finish()
    }
}

impl RealtimeEngine {
    /// Creates a new real-time engine with all subsystems.
    pub fn new(config: &AppConfig, deps: EngineDependencies) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        let realtime = config.realtime.clone();
        let op_timeout = realtime.operation_timeout();
        let instance_id = realtime
            .instance_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let authenticator = Arc::new(SessionAuthenticator::new(
            Arc::new(JwtDecoder::new(&config.auth)),
            config.auth.cookie_name.clone(),
        ));
        let registry = Arc::new(ConnectionRegistry::new());
        let reachability = ReachabilityDirectory::new(
            deps.directory.clone(),
            Duration::from_secs(config.directory.reachability_ttl_seconds),
            op_timeout,
        );
        let router = Arc::new(DeliveryRouter::new(
            instance_id.clone(),
            registry.clone(),
            deps.bus.clone(),
            config.bus.dm_topic.clone(),
            op_timeout,
        ));
        let broadcaster = Arc::new(PresenceBroadcaster::new(
            deps.users.clone(),
            reachability.clone(),
            router.clone(),
            op_timeout,
        ));
        let relay = Arc::new(MessageRelay::new(
            deps.users,
            deps.messages,
            registry.clone(),
            reachability,
            broadcaster.clone(),
            router.clone(),
            realtime.clone(),
        ));

        info!(instance_id = %instance_id, "Real-time engine initialized");

        Self {
            instance_id,
            authenticator,
            registry,
            broadcaster,
            relay,
            router,
            directory: deps.directory,
            bus: deps.bus,
            config: realtime,
            shutdown_tx,
        }
    }

    /// Subscribes to this instance's inbox and spawns the bus subscriber.
    ///
    /// Fails only if the first subscription fails; later losses of the
    /// stream are retried by the subscriber. Call once per process.
    pub async fn start(&self) -> AppResult<JoinHandle<()>> {
        let stream = self.bus.subscribe(&self.router.inbox_topic()).await?;
        Ok(tokio::spawn(run_subscriber(
            stream,
            self.bus.clone(),
            self.router.clone(),
            self.shutdown_tx.subscribe(),
        )))
    }

    /// Heartbeat watchdog settings for new connections.
    pub fn heartbeat_config(&self) -> HeartbeatConfig {
        HeartbeatConfig {
            check_interval: self.config.heartbeat_interval(),
            timeout: self.config.heartbeat_timeout(),
        }
    }

    /// Real-time configuration.
    pub fn config(&self) -> &RealtimeConfig {
        &self.config
    }

    /// Shared presence directory.
    pub fn directory(&self) -> &Arc<dyn PresenceDirectory> {
        &self.directory
    }

    /// Stops the bus subscriber and closes every local connection.
    pub fn shutdown(&self) {
        info!(instance_id = %self.instance_id, "Shutting down real-time engine");
        let _ = self.shutdown_tx.send(());
        self.registry.close_all();
    }
}
