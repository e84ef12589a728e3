//! Handshake authentication: validates the identity cookie before a
//! connection is admitted.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use http::HeaderMap;
use thiserror::Error;
use uuid::Uuid;

use parley_auth::cookie::token_from_headers;
use parley_auth::jwt::JwtDecoder;
use parley_core::error::AppError;

/// Why a handshake was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthRejection {
    /// No identity cookie on the request.
    #[error("Authentication token required")]
    MissingCredential,
    /// The cookie is present but malformed, expired, wrongly signed or of
    /// the wrong token type.
    #[error("Invalid or expired token: {0}")]
    InvalidCredential(String),
}

impl From<AuthRejection> for AppError {
    fn from(rejection: AuthRejection) -> Self {
        AppError::authentication(rejection.to_string())
    }
}

/// Identity of an admitted connection. Fixed for the connection's life.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    /// Authenticated user.
    pub user_id: Uuid,
    /// Handle assigned to this connection.
    pub connection_id: Uuid,
    /// Admission time.
    pub connected_at: DateTime<Utc>,
}

impl SessionContext {
    /// Create a context for a freshly verified user.
    pub fn new(user_id: Uuid) -> Self {
        Self {
            user_id,
            connection_id: Uuid::new_v4(),
            connected_at: Utc::now(),
        }
    }
}

/// Authenticates connection handshakes from the identity cookie.
#[derive(Clone)]
pub struct SessionAuthenticator {
    /// JWT decoder.
    decoder: Arc<JwtDecoder>,
    /// Name of the cookie carrying the token.
    cookie_name: String,
}

impl std::fmt::Debug for SessionAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionAuthenticator")
            .field("cookie_name", &self.cookie_name)
            .finish()
    }
}

impl SessionAuthenticator {
    /// Creates a new authenticator.
    pub fn new(decoder: Arc<JwtDecoder>, cookie_name: impl Into<String>) -> Self {
        Self {
            decoder,
            cookie_name: cookie_name.into(),
        }
    }

    /// Verifies the handshake headers and builds the session context.
    ///
    /// Has no side effects; registration happens only after this succeeds.
    pub fn authenticate(&self, headers: &HeaderMap) -> Result<SessionContext, AuthRejection> {
        let token =
            token_from_headers(headers, &self.cookie_name).ok_or(AuthRejection::MissingCredential)?;

        let claims = self
            .decoder
            .decode_access_token(&token)
            .map_err(|e| AuthRejection::InvalidCredential(e.message))?;

        Ok(SessionContext::new(claims.user_id()))
    }
}
