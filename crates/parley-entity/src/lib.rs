//! # parley-entity
//!
//! Domain entity models for Parley. Database entities derive
//! `sqlx::FromRow`; value objects shared through the presence
//! directory are plain serde types.

pub mod message;
pub mod presence;
pub mod user;
