//! Core traits defined in `parley-core` and implemented by other crates.

pub mod bus;
pub mod directory;

pub use bus::{BusStream, MessageBus};
pub use directory::PresenceDirectory;
