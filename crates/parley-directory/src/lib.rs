//! # parley-directory
//!
//! Presence directory providers for Parley. Supports two modes:
//!
//! - **memory**: in-process store using [moka](https://crates.io/crates/moka),
//!   for single-node deployments and tests
//! - **redis**: shared store using the [redis](https://crates.io/crates/redis)
//!   crate, visible to every process instance
//!
//! The provider is selected at runtime based on configuration.

pub mod keys;
#[cfg(feature = "memory")]
pub mod memory;
pub mod provider;
#[cfg(feature = "redis-backend")]
pub mod redis;

pub use provider::DirectoryManager;
