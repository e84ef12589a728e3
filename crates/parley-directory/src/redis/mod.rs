//! Redis presence directory.

pub mod client;
pub mod operations;

pub use client::RedisClient;
pub use operations::RedisDirectory;
