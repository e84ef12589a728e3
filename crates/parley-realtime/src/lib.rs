//! # parley-realtime
//!
//! Real-time core of Parley. Provides:
//!
//! - Session authentication from the handshake cookie
//! - A per-process connection registry with bounded per-connection queues
//! - Presence broadcasting to a user's friends
//! - Direct-message relay across process instances over a pub/sub bus
//! - Heartbeat watchdog for silent connections

pub mod bridge;
pub mod connection;
pub mod message;
pub mod presence;
pub mod relay;
pub mod server;
#[cfg(any(test, feature = "test-util"))]
pub mod testing;
pub mod timeout;

pub use connection::authenticator::{AuthRejection, SessionAuthenticator, SessionContext};
pub use connection::registry::ConnectionRegistry;
pub use presence::broadcaster::PresenceBroadcaster;
pub use relay::relay::MessageRelay;
pub use server::{EngineDependencies, RealtimeEngine};
