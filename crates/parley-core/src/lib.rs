//! # parley-core
//!
//! Core crate for Parley. Contains configuration schemas, the unified
//! error system, and the traits for the shared presence directory and
//! the publish/subscribe bus.
//!
//! This crate has **no** internal dependencies on other Parley crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;

pub use error::AppError;
pub use result::AppResult;
