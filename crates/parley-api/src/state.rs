//! Application state shared across all handlers.

use std::sync::Arc;

use parley_core::config::AppConfig;
use parley_database::store::{MessageStore, StoreHealth, UserStore};
use parley_realtime::server::RealtimeEngine;

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<AppConfig>,
    /// Real-time engine of this process
    pub realtime: RealtimeEngine,
    /// User store
    pub users: Arc<dyn UserStore>,
    /// Message store
    pub messages: Arc<dyn MessageStore>,
    /// Durable store connectivity, for detailed health
    pub database: Arc<dyn StoreHealth>,
}
