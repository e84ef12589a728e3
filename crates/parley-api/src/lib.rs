//! # parley-api
//!
//! HTTP layer for Parley built on Axum.
//!
//! Provides the WebSocket upgrade at `/ws`, conversation history and
//! sender listing under `/api`, health checks, and error mapping.

pub mod dto;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use error::ApiError;
pub use router::build_router;
pub use state::AppState;
