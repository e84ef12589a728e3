//! # parley-auth
//!
//! Identity tokens for Parley: HS256 JWT creation and verification, and
//! extraction of the token from the `Cookie` header of an HTTP or
//! WebSocket handshake request.

pub mod cookie;
pub mod jwt;

pub use jwt::{Claims, JwtDecoder, JwtEncoder};
