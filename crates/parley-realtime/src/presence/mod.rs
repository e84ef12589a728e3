//! Presence: who is reachable where, and telling their friends.

pub mod broadcaster;
pub mod reachability;

pub use broadcaster::PresenceBroadcaster;
pub use reachability::ReachabilityDirectory;
