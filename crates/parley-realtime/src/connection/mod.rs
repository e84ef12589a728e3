//! Connection lifecycle: authentication, handles, registry, keepalive.

pub mod authenticator;
pub mod handle;
pub mod heartbeat;
pub mod registry;
pub mod state;

pub use authenticator::{AuthRejection, SessionAuthenticator, SessionContext};
pub use handle::{ConnectionHandle, ConnectionId};
pub use registry::ConnectionRegistry;
pub use state::ConnectionState;
