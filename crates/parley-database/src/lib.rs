//! # parley-database
//!
//! PostgreSQL connection management, the durable store traits consumed
//! by the real-time core, and their repository implementations.

pub mod connection;
pub mod migration;
pub mod repositories;
pub mod store;

pub use connection::DatabasePool;
pub use store::{MessageStore, StoreHealth, UserStore};
