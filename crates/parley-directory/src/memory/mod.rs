//! In-memory presence directory.

pub mod store;

pub use store::MemoryDirectory;
