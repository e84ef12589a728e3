//! Presence value objects shared across process instances.

pub mod reachability;

pub use reachability::ReachabilityRecord;
